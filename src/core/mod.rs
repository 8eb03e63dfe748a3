pub mod errors;
pub mod http;
pub mod lines;
pub mod models;
pub mod pipeline;
pub mod utils;

pub use errors::{ GenerationError, Stage, YomicardError };
pub use models::{ FlashcardNote, NoteFields, WordRecord, WordSet };
pub use pipeline::Pipeline;
