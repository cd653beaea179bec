// PDF adapter for the `DocumentReader` port.

pub mod pdf_reader;

pub use pdf_reader::PdfOxideReader;
