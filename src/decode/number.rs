use crate::constants::{DEC_MAX, DIV_MAX, EXP_MAX};
use crate::decode::tables::{self, Mode};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum NumberValue {
    Int(i64),
    Decimal(f64),
    /// Too large or too precise for a machine number; keep the text.
    Big,
}

/// Digits of a numeral, accumulated as the parser reads them.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Numeral {
    negative: bool,
    int: u64,
    frac: u64,
    div: u64,
    exp: i64,
    exp_negative: bool,
    digits: usize,
    zeros: usize,
    big: bool,
}

impl Default for Numeral {
    fn default() -> Self {
        Self::start(false)
    }
}

impl Numeral {
    pub(crate) fn start(negative: bool) -> Self {
        Self {
            negative,
            int: 0,
            frac: 0,
            div: 1,
            exp: 0,
            exp_negative: false,
            digits: 0,
            zeros: 0,
            big: false,
        }
    }

    /// Counts every digit of the integer and fraction, leading zeros
    /// included; `zeros` tracks the current run of trailing zeros so it can
    /// be discounted.
    fn count(&mut self, digit: u8) {
        self.digits += 1;
        if digit == 0 {
            self.zeros += 1;
        } else {
            self.zeros = 0;
        }
    }

    pub(crate) fn int_digit(&mut self, digit: u8) {
        self.count(digit);
        if self.big {
            return;
        }
        let limit = if self.negative {
            1u64 << 63
        } else {
            i64::MAX as u64
        };
        match self
            .int
            .checked_mul(10)
            .and_then(|value| value.checked_add(digit as u64))
        {
            Some(value) if value <= limit => self.int = value,
            _ => self.big = true,
        }
    }

    pub(crate) fn frac_digit(&mut self, digit: u8) {
        self.count(digit);
        if self.big {
            return;
        }
        let next = self
            .frac
            .checked_mul(10)
            .and_then(|value| value.checked_add(digit as u64));
        match (next, self.div.checked_mul(10)) {
            (Some(frac), Some(div)) if div < DIV_MAX && self.digits - self.zeros <= DEC_MAX => {
                self.frac = frac;
                self.div = div;
            }
            _ => self.big = true,
        }
    }

    pub(crate) fn exp_sign(&mut self, negative: bool) {
        self.exp_negative = negative;
    }

    pub(crate) fn exp_digit(&mut self, digit: u8) {
        self.exp = self.exp.saturating_mul(10).saturating_add(digit as i64);
        if self.exp >= EXP_MAX {
            self.big = true;
        }
    }

    pub(crate) fn finish(&self) -> NumberValue {
        if self.big {
            return NumberValue::Big;
        }
        if self.div == 1 && self.exp == 0 {
            let value = self.int as i64;
            return NumberValue::Int(if self.negative {
                value.wrapping_neg()
            } else {
                value
            });
        }
        let mut value = self.int as f64 + self.frac as f64 / self.div as f64;
        if self.negative {
            value = -value;
        }
        if self.exp != 0 {
            let exp = if self.exp_negative { -self.exp } else { self.exp };
            value *= 10f64.powi(exp as i32);
        }
        if value.is_finite() {
            NumberValue::Decimal(value)
        } else {
            NumberValue::Big
        }
    }
}

/// True when `text` is exactly one JSON numeral.
pub fn is_numeral(text: &str) -> bool {
    let mut mode = Mode::Value;
    for &byte in text.as_bytes() {
        match tables::number_step(tables::table(mode)[byte as usize]) {
            Some(next) => mode = next,
            None => return false,
        }
    }
    mode.ends_number()
}

/// Classifies a numeral the way the parser does.
pub(crate) fn classify(text: &str) -> Option<NumberValue> {
    if !is_numeral(text) {
        return None;
    }
    let bytes = text.as_bytes();
    let negative = bytes.first() == Some(&b'-');
    let mut numeral = Numeral::start(negative);
    let mut part = Mode::Digit;
    for &byte in &bytes[negative as usize..] {
        match byte {
            b'.' => part = Mode::Fraction,
            b'e' | b'E' => part = Mode::Exponent,
            b'+' => {}
            b'-' => numeral.exp_sign(true),
            digit => {
                let digit = digit - b'0';
                match part {
                    Mode::Fraction => numeral.frac_digit(digit),
                    Mode::Exponent => numeral.exp_digit(digit),
                    _ => numeral.int_digit(digit),
                }
            }
        }
    }
    Some(numeral.finish())
}
