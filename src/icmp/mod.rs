pub(crate) mod echo;
pub(crate) mod socket;

pub(crate) use socket::{Socket, TSocket};
