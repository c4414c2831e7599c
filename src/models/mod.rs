//! Data models for the OCR service.

mod job;
mod result;

pub use job::{Job, JobMeta, JobStatus, NewJob};
pub use result::{
    Block, BlockType, BoundingBox, DetectedList, DetectedTable, DocumentClass, DocumentStructure,
    Entity, KeyValuePair, Line, LineAlignment, NotableData, OcrOutput, PageLayout, Paragraph,
    ResultMetadata, SmartField, TextType, Word, WordContentType,
};
