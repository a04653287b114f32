mod jsonl;

pub use jsonl::{load_from_jsonl, save_to_jsonl};
