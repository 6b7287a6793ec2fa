//! Domain model (request types, job descriptors, result payloads, notifications).

pub mod events;
pub mod ids;
pub mod job;
pub mod outcome;
pub mod request_type;

pub use self::events::JobDone;
pub use self::ids::JobId;
pub use self::job::JobDescriptor;
pub use self::outcome::ResultPayload;
pub use self::request_type::RequestType;
