//! Collision-checked identifier generation.
//!
//! Ids are random v4 UUIDs in canonical hyphenated form. The probe is asked
//! about every candidate and the loop only returns one nobody uses, so a
//! caller can never receive an id that clashes with an existing post or
//! comment.

use tracing::warn;
use uuid::Uuid;

use crate::error::Result;
use crate::traits::IdProbe;

/// Draws random ids until `probe` reports one as free.
pub async fn next_id<P>(probe: &mut P) -> Result<String>
where
    P: IdProbe + ?Sized,
{
    next_id_with(probe, Uuid::new_v4).await
}

/// Same as [`next_id`] with an explicit candidate source.
pub async fn next_id_with<P, F>(probe: &mut P, mut candidate: F) -> Result<String>
where
    P: IdProbe + ?Sized,
    F: FnMut() -> Uuid + Send,
{
    loop {
        let id = candidate().to_string();
        if !probe.is_taken(&id).await? {
            return Ok(id);
        }
        warn!(%id, "identifier collision, drawing another");
    }
}
