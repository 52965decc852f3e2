//! Batch entry points over many independent inputs, spread across the
//! rayon thread pool. Each worker draws pools from its own reservoir
//! unless [`crate::decode::pool::set_thread_safe`] is on.

use rayon::prelude::*;

use crate::document::Document;
use crate::{Parser, Result};

/// Below this many inputs the batch runs on the calling thread.
const PARALLEL_THRESHOLD: usize = 4;

/// Validates each input; results line up with `inputs`.
pub fn validate_all<I>(inputs: &[I]) -> Vec<Result<()>>
where
    I: AsRef<[u8]> + Sync,
{
    let validate = |input: &I| Parser::from_slice(input.as_ref()).validate();
    if inputs.len() < PARALLEL_THRESHOLD {
        return inputs.iter().map(validate).collect();
    }
    inputs.par_iter().map(validate).collect()
}

/// Parses each input into its own document; results line up with `inputs`.
pub fn parse_all<I>(inputs: &[I]) -> Vec<Result<Document>>
where
    I: AsRef<[u8]> + Sync,
{
    let parse = |input: &I| Parser::from_slice(input.as_ref()).parse_document();
    if inputs.len() < PARALLEL_THRESHOLD {
        return inputs.iter().map(parse).collect();
    }
    inputs.par_iter().map(parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    fn test_results_line_up() {
        let inputs: Vec<String> = (0..64)
            .map(|i| if i % 10 == 3 { format!("[{i}") } else { format!("[{i}]") })
            .collect();
        let checked = validate_all(&inputs);
        let parsed = parse_all(&inputs);
        for (i, (checked, parsed)) in checked.iter().zip(&parsed).enumerate() {
            assert_eq!(checked.is_ok(), i % 10 != 3);
            if let Ok(doc) = parsed {
                assert_eq!(doc.to_json(0), format!("[{i}]"));
            }
        }
    }

    #[rstest::rstest]
    fn test_small_batch() {
        let parsed = parse_all(&["{}", "null"]);
        assert_eq!(parsed.len(), 2);
        assert!(parsed.iter().all(Result::is_ok));
    }
}
