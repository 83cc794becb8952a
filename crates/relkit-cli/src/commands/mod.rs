mod e2e;
mod keygen;
mod publish;

pub use e2e::e2e;
pub use keygen::keygen;
pub use publish::publish;
