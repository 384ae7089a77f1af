//! Effect — what a rule does when its trigger fires.
//!
//! The domain only knows the serialized [`EffectDescription`] and the
//! [`EffectEvent`]s emitted while effects run. Executable effects live in the
//! `app` crate because applying them needs the gateway port.

mod description;
mod event;

pub use description::{EffectDescription, EffectKind};
pub use event::{EffectEvent, EffectEventKind};
