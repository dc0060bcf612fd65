use serde::Serialize;
use tracing::{info, warn};

use crate::club_db::{ClubDatabase, NewMatch, NewPlayer};
use crate::error::StoreError;
use crate::model::{Match, MatchStatus, Player};
use crate::notify::{DeliveryResult, Message, NotificationDispatcher};
use crate::persist::KeyValueStore;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledMatch {
    #[serde(rename = "match")]
    pub scheduled: Match,
    pub deliveries: Vec<DeliveryResult>,
}

/// Store plus notifications, wired together once at startup.
pub struct Club<S: KeyValueStore> {
    pub db: ClubDatabase<S>,
    pub dispatcher: NotificationDispatcher,
}

impl<S: KeyValueStore> Club<S> {
    pub fn new(db: ClubDatabase<S>, dispatcher: NotificationDispatcher) -> Self {
        Self { db, dispatcher }
    }

    /// Registers the player, then sends a best-effort welcome. Only the registration can fail.
    pub fn register_player(&mut self, data: NewPlayer) -> Result<Player, StoreError> {
        let player = self.db.add_player(data)?;
        let results = self.dispatcher.notify_all(
            std::slice::from_ref(&player),
            &Message::welcome(),
            &mut self.db,
        );
        if results.iter().any(|r| !r.email_sent && !r.whatsapp_sent) {
            warn!(player_id = player.id, "welcome message not delivered");
        }
        Ok(player)
    }

    /// Adds the match, then notifies active players if it has not started yet.
    ///
    /// The two steps are not atomic: the match is persisted even if every
    /// notification fails.
    pub fn schedule_match(&mut self, data: NewMatch) -> Result<ScheduledMatch, StoreError> {
        let scheduled = self.db.add_match(data)?;
        let deliveries = if scheduled.status == MatchStatus::NotStarted {
            let players = self.db.active_players();
            let message = Message::new_match(&scheduled);
            self.dispatcher.notify_all(&players, &message, &mut self.db)
        } else {
            Vec::new()
        };
        info!(match_id = %scheduled.id, notified = deliveries.len(), "match scheduled");
        Ok(ScheduledMatch {
            scheduled,
            deliveries,
        })
    }

    pub fn send_reminder(&mut self, match_id: &str) -> Result<Vec<DeliveryResult>, StoreError> {
        let m = self
            .db
            .get_match(match_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("match not found"))?;
        let players = self.db.active_players();
        Ok(self
            .dispatcher
            .notify_all(&players, &Message::reminder(&m), &mut self.db))
    }
}
