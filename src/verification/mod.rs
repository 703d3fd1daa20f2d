pub mod response;
pub mod vision;

pub use response::{extract_json_object, parse_structured};
pub use vision::{DocumentBytes, GeminiVisionClient, VisionAnalyzer};
