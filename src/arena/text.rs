use smol_str::SmolStr;

use crate::constants::{BSTR_CAPACITY, INLINE_MAX};

/// Storage for a string payload or key. Short text lives in the node,
/// medium text in a pooled block, long text on the heap.
#[derive(Debug)]
pub(crate) enum Text {
    Inline(SmolStr),
    Block(u32),
    Heap(Box<str>),
}

#[derive(Debug, Default)]
struct Block {
    text: String,
    live: bool,
}

/// Free-listed string blocks of [`BSTR_CAPACITY`] bytes.
#[derive(Debug, Default)]
pub(crate) struct BlockStore {
    blocks: Vec<Block>,
    free: Vec<u32>,
}

impl BlockStore {
    pub(crate) const fn new() -> Self {
        Self {
            blocks: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn store(&mut self, value: &str) -> Text {
        if value.len() <= INLINE_MAX {
            return Text::Inline(SmolStr::new(value));
        }
        if value.len() >= BSTR_CAPACITY {
            return Text::Heap(value.into());
        }
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.blocks.push(Block::default());
                (self.blocks.len() - 1) as u32
            }
        };
        let block = &mut self.blocks[index as usize];
        if block.text.capacity() < BSTR_CAPACITY {
            block.text.reserve_exact(BSTR_CAPACITY);
        }
        block.text.push_str(value);
        block.live = true;
        Text::Block(index)
    }

    pub(crate) fn resolve<'a>(&'a self, text: &'a Text) -> &'a str {
        match text {
            Text::Inline(value) => value.as_str(),
            Text::Heap(value) => value,
            Text::Block(index) => self
                .blocks
                .get(*index as usize)
                .map(|block| block.text.as_str())
                .unwrap_or(""),
        }
    }

    pub(crate) fn free(&mut self, text: Text) {
        if let Text::Block(index) = text {
            if let Some(block) = self.blocks.get_mut(index as usize) {
                if block.live {
                    block.text.clear();
                    block.live = false;
                    self.free.push(index);
                }
            }
        }
    }

    /// Marks every block free, keeping their capacity.
    pub(crate) fn reset(&mut self) {
        self.free.clear();
        for (index, block) in self.blocks.iter_mut().enumerate() {
            block.text.clear();
            block.live = false;
            self.free.push(index as u32);
        }
    }

    /// Drops trailing free blocks and the buffers of the free ones that
    /// remain. Returns the number of blocks dropped outright.
    pub(crate) fn shrink(&mut self) -> usize {
        let before = self.blocks.len();
        while self.blocks.last().is_some_and(|block| !block.live) {
            self.blocks.pop();
        }
        self.free.clear();
        for (index, block) in self.blocks.iter_mut().enumerate() {
            if !block.live {
                block.text = String::new();
                self.free.push(index as u32);
            }
        }
        self.blocks.shrink_to_fit();
        self.free.shrink_to_fit();
        before - self.blocks.len()
    }

    pub(crate) fn live(&self) -> usize {
        self.blocks.len() - self.free.len()
    }

    pub(crate) fn free_count(&self) -> usize {
        self.free.len()
    }
}
