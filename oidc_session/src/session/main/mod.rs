mod coordinator;
mod handle;
mod subscription;

#[cfg(test)]
pub(crate) mod test_utils;

pub use coordinator::SessionCoordinator;
pub use handle::SessionHandle;
