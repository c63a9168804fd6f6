//! Topic subscriptions
//!
//! Users subscribe to a topic by its heading name (`h-<author>-<timestamp>`), which survives
//! edits to the heading text. Storage is an external collaborator behind
//! [`SubscriptionStore`]; [`InMemorySubscriptionStore`] backs tests and the CLI.
//!
//! States are stored as small integers:
//!
//!     0  unsubscribed    the user opted out; kept so auto-subscription does not resurrect it
//!     1  subscribed      set explicitly by the user
//!     2  auto-subscribed set when the user took part in the topic

use crate::error::{ToolsError, ToolsResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SubscriptionState {
    Unsubscribed = 0,
    Subscribed = 1,
    AutoSubscribed = 2,
}

impl From<SubscriptionState> for u8 {
    fn from(state: SubscriptionState) -> Self {
        state as u8
    }
}

impl TryFrom<u8> for SubscriptionState {
    type Error = ToolsError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SubscriptionState::Unsubscribed),
            1 => Ok(SubscriptionState::Subscribed),
            2 => Ok(SubscriptionState::AutoSubscribed),
            other => Err(ToolsError::Store(format!("unknown subscription state {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionItem {
    pub user: String,
    /// Title of the page the topic was on when the subscription was made.
    pub page: String,
    pub item_name: String,
    pub state: SubscriptionState,
    pub created: DateTime<Utc>,
    pub notified: Option<DateTime<Utc>>,
}

pub trait SubscriptionStore {
    /// A user's subscriptions, optionally only those to the given item names.
    fn items_for_user(
        &self,
        user: &str,
        item_names: Option<&[String]>,
    ) -> ToolsResult<Vec<SubscriptionItem>>;

    /// Subscriptions to one item in any of the given states.
    fn items_for_topic(
        &self,
        item_name: &str,
        states: &[SubscriptionState],
    ) -> ToolsResult<Vec<SubscriptionItem>>;

    /// Subscribe explicitly, overriding any earlier state.
    fn add(
        &mut self,
        user: &str,
        page: &str,
        item_name: &str,
        now: DateTime<Utc>,
    ) -> ToolsResult<()>;

    /// Subscribe automatically, unless the user has any subscription row for the item
    /// (including an explicit opt-out). Returns whether a row was added.
    fn add_auto(
        &mut self,
        user: &str,
        page: &str,
        item_name: &str,
        now: DateTime<Utc>,
    ) -> ToolsResult<bool>;

    /// Mark the user's subscription as unsubscribed. Returns whether there was one.
    fn remove(&mut self, user: &str, item_name: &str) -> ToolsResult<bool>;

    /// Set the notified timestamp of every subscription to the item. Returns the row count.
    fn update_notified(&mut self, item_name: &str, now: DateTime<Utc>) -> ToolsResult<usize>;
}

#[derive(Debug, Default)]
pub struct InMemorySubscriptionStore {
    items: Vec<SubscriptionItem>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, user: &str, item_name: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.user == user && item.item_name == item_name)
    }
}

impl SubscriptionStore for InMemorySubscriptionStore {
    fn items_for_user(
        &self,
        user: &str,
        item_names: Option<&[String]>,
    ) -> ToolsResult<Vec<SubscriptionItem>> {
        Ok(self
            .items
            .iter()
            .filter(|item| item.user == user)
            .filter(|item| item_names.map_or(true, |names| names.contains(&item.item_name)))
            .cloned()
            .collect())
    }

    fn items_for_topic(
        &self,
        item_name: &str,
        states: &[SubscriptionState],
    ) -> ToolsResult<Vec<SubscriptionItem>> {
        Ok(self
            .items
            .iter()
            .filter(|item| item.item_name == item_name && states.contains(&item.state))
            .cloned()
            .collect())
    }

    fn add(
        &mut self,
        user: &str,
        page: &str,
        item_name: &str,
        now: DateTime<Utc>,
    ) -> ToolsResult<()> {
        match self.position(user, item_name) {
            Some(index) => {
                let item = &mut self.items[index];
                item.state = SubscriptionState::Subscribed;
                item.page = page.to_string();
            }
            None => self.items.push(SubscriptionItem {
                user: user.to_string(),
                page: page.to_string(),
                item_name: item_name.to_string(),
                state: SubscriptionState::Subscribed,
                created: now,
                notified: None,
            }),
        }
        Ok(())
    }

    fn add_auto(
        &mut self,
        user: &str,
        page: &str,
        item_name: &str,
        now: DateTime<Utc>,
    ) -> ToolsResult<bool> {
        if self.position(user, item_name).is_some() {
            return Ok(false);
        }
        self.items.push(SubscriptionItem {
            user: user.to_string(),
            page: page.to_string(),
            item_name: item_name.to_string(),
            state: SubscriptionState::AutoSubscribed,
            created: now,
            notified: None,
        });
        Ok(true)
    }

    fn remove(&mut self, user: &str, item_name: &str) -> ToolsResult<bool> {
        match self.position(user, item_name) {
            Some(index) => {
                self.items[index].state = SubscriptionState::Unsubscribed;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn update_notified(&mut self, item_name: &str, now: DateTime<Utc>) -> ToolsResult<usize> {
        let mut updated = 0;
        for item in self.items.iter_mut().filter(|item| item.item_name == item_name) {
            item.notified = Some(now);
            updated += 1;
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 5, 1, 12, 0, 0).unwrap()
    }

    const TOPIC: &str = "h-Alice-20210501100000";

    #[test]
    fn explicit_opt_out_blocks_auto_subscription() {
        let mut store = InMemorySubscriptionStore::new();
        store.add("Bob", "Talk:Example", TOPIC, now()).unwrap();
        assert!(store.remove("Bob", TOPIC).unwrap());
        assert!(!store.add_auto("Bob", "Talk:Example", TOPIC, now()).unwrap());

        let items = store.items_for_user("Bob", None).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].state, SubscriptionState::Unsubscribed);
    }

    #[test]
    fn explicit_subscription_promotes_auto() {
        let mut store = InMemorySubscriptionStore::new();
        assert!(store.add_auto("Carol", "Talk:Example", TOPIC, now()).unwrap());
        store.add("Carol", "Talk:Example", TOPIC, now()).unwrap();
        let subscribed = store
            .items_for_topic(TOPIC, &[SubscriptionState::Subscribed])
            .unwrap();
        assert_eq!(subscribed.len(), 1);
        assert_eq!(subscribed[0].user, "Carol");
    }

    #[test]
    fn filters_user_items_by_name() {
        let mut store = InMemorySubscriptionStore::new();
        store.add("Dave", "Talk:A", TOPIC, now()).unwrap();
        store.add("Dave", "Talk:B", "h-Erin-20210502100000", now()).unwrap();
        let names = vec![TOPIC.to_string()];
        let items = store.items_for_user("Dave", Some(&names)).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].page, "Talk:A");
    }

    #[test]
    fn states_serialize_as_integers() {
        assert_eq!(
            serde_json::to_string(&SubscriptionState::AutoSubscribed).unwrap(),
            "2"
        );
        assert!(serde_json::from_str::<SubscriptionState>("7").is_err());
    }
}
