// Handlers are split by access tier:
// public (no session, or an optional one) and protected (session required)
pub mod body;
pub mod protected;
pub mod public;
