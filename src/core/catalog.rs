use crate::adapters::schema::{self, decode_all};
use crate::core::query::Filter;
use crate::domain::model::{Chauffeur, Event};
use crate::domain::ports::{RecordStore, Table};
use crate::utils::error::{AvailabilityError, Result};

/// Roster of chauffeurs, in the order the store returns them.
pub async fn fetch_chauffeurs<S: RecordStore + ?Sized>(store: &S) -> Result<Vec<Chauffeur>> {
    let records = store
        .list(Table::Chauffeurs, &Filter::All)
        .await
        .map_err(|e| AvailabilityError::fetch("chauffeurs", e))?;

    let chauffeurs = decode_all(Table::Chauffeurs, &records, schema::decode_chauffeur);
    tracing::info!("Fetched {} chauffeurs", chauffeurs.len());
    Ok(chauffeurs)
}

/// Scheduled events ordered by start time.
pub async fn fetch_events<S: RecordStore + ?Sized>(store: &S) -> Result<Vec<Event>> {
    let records = store
        .list(Table::Events, &Filter::All)
        .await
        .map_err(|e| AvailabilityError::fetch("events", e))?;

    let mut events = decode_all(Table::Events, &records, schema::decode_event);
    events.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then_with(|| a.name.cmp(&b.name)));
    tracing::info!("Fetched {} events", events.len());
    Ok(events)
}
