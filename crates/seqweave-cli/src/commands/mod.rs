pub mod decode;
pub mod vocab;
