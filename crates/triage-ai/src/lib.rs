//! Ticket classification: a keyword baseline and ONNX Runtime transformer models.

mod classifier;
mod handle;
mod keyword;
#[cfg(feature = "onnx")]
mod onnx;

pub use classifier::{Classifier, ClassifierError, classify, softmax};
pub use handle::ClassifierHandle;
pub use keyword::{KEYWORD_MODEL_NAME, KeywordClassifier};
#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;
