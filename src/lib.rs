//! Minimal retrieval-augmented generation demo: plain-text files are split
//! into fixed-size chunks, embedded via the OpenAI API, stored in Postgres
//! with pgvector, and retrieved by cosine similarity to ground a one-shot
//! chat completion.

pub mod chunker;
pub mod openai;
pub mod pipeline;
pub mod probe;
pub mod store;
