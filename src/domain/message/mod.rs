//! SIP message bounded context - the in-memory model of one SIP message

pub mod entity;
pub mod headers;
pub mod pool;
pub mod value_object;

pub use entity::SipMessage;
pub use headers::HeaderStore;
pub use pool::MessagePool;
pub use value_object::{
    header_names, is_code_valid, CSeq, MessageType, RequestLine, ResponseLine, StartLine,
    SIP_VERSION,
};
