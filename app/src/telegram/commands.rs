//! Chat commands and the long-poll loop that feeds them

use super::api::{BotCommand, Message};
use super::{format, TelegramApi};
use slotwatch_core::{parse_id_list, Result, RewardId};
use slotwatch_engine::TrackingService;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const LONG_POLL_SECS: u64 = 30;
const RETRY_DELAY: Duration = Duration::from_secs(5);

const NOT_PUBLIC: &str = "This bot is not yet available for the public. If you are interested, please contact this bot's creator (see bot description)";
const NOT_REGISTERED: &str = "You are not registered yet. Send /start first.";
const NO_VALID_IDS: &str = "No valid reward IDs provided";
const INTERNAL_ERROR: &str = "Something went wrong, please try again later";

// ─── Parsing ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Add(String),
    Remove(String),
    List,
    ResetNotifications,
    Cancel,
    Privacy,
    Unknown(String),
}

impl Command {
    /// Parse a message text. `None` for anything that is not a command.
    /// Accepts the `/cmd@botname` form Telegram uses in groups.
    pub fn parse(text: &str) -> Option<Command> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim().to_string()),
            None => (rest, String::new()),
        };
        let name = head.split('@').next().unwrap_or(head).to_lowercase();

        Some(match name.as_str() {
            "start" => Command::Start,
            "add" => Command::Add(args),
            "remove" => Command::Remove(args),
            "list" => Command::List,
            "reset_notifications" => Command::ResetNotifications,
            "cancel" => Command::Cancel,
            "privacy" => Command::Privacy,
            _ => Command::Unknown(name),
        })
    }
}

/// Command menu registered with Telegram
pub fn bot_commands() -> Vec<BotCommand> {
    let mut commands = vec![
        ("add", "Adds one or more Rewards IDs to the list of observed rewards"),
        ("remove", "Remove one or more Rewards IDs from the list of observed rewards"),
        ("cancel", "Cancels any active conversation"),
        ("list", "Shows a list of currently tracked rewards"),
        (
            "reset_notifications",
            "Resets the notification tracker. Previous notifications for (still) available rewards will be sent again.",
        ),
    ];
    commands.sort_by_key(|(name, _)| *name);
    commands.push(("start", "Starts bot interaction"));
    commands.push(("privacy", "Privacy policy"));

    commands
        .into_iter()
        .map(|(command, description)| BotCommand {
            command: command.to_string(),
            description: description.to_string(),
        })
        .collect()
}

// ─── Handling ────────────────────────────────────────────────────────

pub struct CommandHandler {
    api: TelegramApi,
    tracking: Arc<TrackingService>,
    /// Only this chat may use the bot when set
    creator_id: Option<i64>,
    base_url: String,
}

impl CommandHandler {
    pub fn new(
        api: TelegramApi,
        tracking: Arc<TrackingService>,
        creator_id: Option<i64>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api,
            tracking,
            creator_id,
            base_url: base_url.into(),
        }
    }

    /// Answer one incoming message. Failures are logged, never propagated.
    pub async fn handle(&self, message: &Message) {
        let Some(command) = message.text.as_deref().and_then(Command::parse) else {
            return;
        };
        let chat_id = message.chat.id;
        debug!("Chat {} sent {:?}", chat_id, command);

        let replies = if !self.allowed(chat_id, &command) {
            vec![NOT_PUBLIC.to_string()]
        } else {
            match self.execute(chat_id, command).await {
                Ok(replies) => replies,
                Err(e) => {
                    error!("Command from chat {} failed: {}", chat_id, e);
                    vec![INTERNAL_ERROR.to_string()]
                }
            }
        };

        for reply in replies {
            if let Err(e) = self
                .api
                .send_message(chat_id, &reply, Some(message.message_id))
                .await
            {
                warn!("Failed to reply to chat {}: {}", chat_id, e);
            }
        }
    }

    fn allowed(&self, chat_id: i64, command: &Command) -> bool {
        match self.creator_id {
            Some(creator) => chat_id == creator || *command == Command::Privacy,
            None => true,
        }
    }

    /// Run a command and return the messages to send back
    async fn execute(&self, chat_id: i64, command: Command) -> Result<Vec<String>> {
        let user = match command {
            Command::Start => {
                let registration = self.tracking.register(chat_id).await?;
                let text = if registration.created {
                    "You have been registered as a user. You can start adding rewards that you'd like to track via the /add command."
                } else {
                    "You are already registered. Welcome back!"
                };
                return Ok(vec![text.to_string()]);
            }
            Command::Privacy => return Ok(vec![format::privacy_policy(chat_id)]),
            Command::Cancel => return Ok(vec!["Conversation cancelled".to_string()]),
            Command::Unknown(ref name) => {
                return Ok(vec![format!("Unknown command /{}", format::escape_html(name))])
            }
            _ => match self.tracking.find_user(chat_id).await? {
                Some(user) => user,
                None => return Ok(vec![NOT_REGISTERED.to_string()]),
            },
        };

        let replies = match command {
            Command::Add(args) => {
                let ids: Vec<RewardId> = parse_id_list(&args);
                if ids.is_empty() {
                    vec![NO_VALID_IDS.to_string()]
                } else {
                    let saved = self.tracking.add_rewards(&user, &ids).await?;
                    if saved.is_empty() {
                        vec!["No new reward ID found".to_string()]
                    } else {
                        vec![format!("Now tracking rewards [{}]", join(&saved))]
                    }
                }
            }
            Command::Remove(args) => {
                let ids: Vec<RewardId> = parse_id_list(&args);
                if ids.is_empty() {
                    vec![NO_VALID_IDS.to_string()]
                } else {
                    let removed = self.tracking.remove_rewards(&user, &ids).await?;
                    vec![format!("Removed rewards [{}]", join(&removed))]
                }
            }
            Command::List => {
                let listing = self.tracking.list_rewards(&user).await?;
                let mut replies = vec![format::reward_list(&listing, &self.base_url)];
                if !listing.missing.is_empty() {
                    replies.push(format::rewards_missing(&listing.missing));
                }
                replies
            }
            Command::ResetNotifications => {
                self.tracking.reset_notifications(&user).await?;
                vec!["Notifications reset".to_string()]
            }
            Command::Start | Command::Privacy | Command::Cancel | Command::Unknown(_) => Vec::new(),
        };
        Ok(replies)
    }
}

fn join(ids: &[RewardId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ─── Polling ─────────────────────────────────────────────────────────

/// Poll Telegram for messages until `cancel` fires. Messages are handled
/// concurrently; in-flight handlers are drained before the task ends.
pub fn spawn_command_loop(handler: Arc<CommandHandler>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = handler.api.set_my_commands(&bot_commands()).await {
            warn!("Failed to register bot commands: {}", e);
        }

        info!("Telegram command loop started");
        let mut offset = 0;
        let mut handlers = JoinSet::new();

        loop {
            let polled = tokio::select! {
                _ = cancel.cancelled() => break,
                polled = handler.api.get_updates(offset, LONG_POLL_SECS) => polled,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        if let Some(message) = update.message {
                            let handler = Arc::clone(&handler);
                            handlers.spawn(async move { handler.handle(&message).await });
                        }
                    }
                }
                Err(e) => {
                    warn!("Polling Telegram updates failed: {}", e);
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(RETRY_DELAY) => {}
                    }
                }
            }

            while let Some(done) = handlers.try_join_next() {
                if let Err(e) = done {
                    warn!("Command handler task failed: {}", e);
                }
            }
        }

        while handlers.join_next().await.is_some() {}
        info!("Telegram command loop stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotwatch_core::{
        Campaign, CampaignAttributes, CampaignId, CampaignReference, CampaignRelationship, Error,
        Reward, RewardAttributes, RewardRelationships,
    };
    use slotwatch_networking::{DispatcherConfig, FetchDispatcher, RewardSource};
    use slotwatch_persistence::{ApiCaches, InMemoryStore};

    /// Ids below 100 exist and belong to campaign 1
    struct Upstream;

    #[async_trait::async_trait]
    impl RewardSource for Upstream {
        async fn fetch_reward(&self, id: RewardId) -> Result<Reward> {
            if id.as_u64() >= 100 {
                return Err(Error::Status {
                    code: 404,
                    url: id.api_path(),
                });
            }
            Ok(Reward {
                id,
                attributes: RewardAttributes {
                    title: format!("Tier {}", id),
                    ..Default::default()
                },
                relationships: RewardRelationships {
                    campaign: Some(CampaignRelationship {
                        data: Some(CampaignReference {
                            id: CampaignId(1),
                            kind: "campaign".to_string(),
                        }),
                    }),
                },
            })
        }

        async fn fetch_campaign(&self, id: CampaignId) -> Result<Campaign> {
            Ok(Campaign {
                id,
                kind: "campaign".to_string(),
                attributes: CampaignAttributes {
                    name: "Creator".to_string(),
                    ..Default::default()
                },
            })
        }
    }

    fn handler(creator_id: Option<i64>) -> CommandHandler {
        let dispatcher = FetchDispatcher::new(
            Arc::new(Upstream),
            ApiCaches::default(),
            &DispatcherConfig::default(),
        );
        let tracking = TrackingService::new(Arc::new(InMemoryStore::new()), dispatcher);
        let api = TelegramApi::with_api_url("http://127.0.0.1:9", "test").unwrap();
        CommandHandler::new(api, Arc::new(tracking), creator_id, "https://www.patreon.com")
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/list@slotwatch_bot"), Some(Command::List));
        assert_eq!(
            Command::parse("/add 1, 2 3"),
            Some(Command::Add("1, 2 3".to_string()))
        );
        assert_eq!(Command::parse("/REMOVE 4"), Some(Command::Remove("4".to_string())));
        assert_eq!(
            Command::parse("/reset_notifications"),
            Some(Command::ResetNotifications)
        );
        assert_eq!(Command::parse("/nope"), Some(Command::Unknown("nope".to_string())));
        assert_eq!(Command::parse("hello"), None);
    }

    #[test]
    fn test_bot_commands_order() {
        let names: Vec<String> = bot_commands().into_iter().map(|c| c.command).collect();
        assert_eq!(
            names,
            vec!["add", "cancel", "list", "remove", "reset_notifications", "start", "privacy"]
        );
    }

    #[test]
    fn test_creator_only_gating() {
        let open = handler(None);
        assert!(open.allowed(5, &Command::List));

        let private = handler(Some(42));
        assert!(private.allowed(42, &Command::List));
        assert!(!private.allowed(5, &Command::List));
        assert!(private.allowed(5, &Command::Privacy));
    }

    #[tokio::test]
    async fn test_commands_require_registration() {
        let handler = handler(None);

        let replies = handler.execute(42, Command::List).await.unwrap();
        assert_eq!(replies, vec![NOT_REGISTERED.to_string()]);
    }

    #[tokio::test]
    async fn test_add_list_remove_flow() {
        let handler = handler(None);

        let replies = handler.execute(42, Command::Start).await.unwrap();
        assert!(replies[0].contains("registered as a user"));
        let replies = handler.execute(42, Command::Start).await.unwrap();
        assert!(replies[0].contains("Welcome back"));

        let replies = handler
            .execute(42, Command::Add("1, 2 500 abc".to_string()))
            .await
            .unwrap();
        assert_eq!(replies, vec!["Now tracking rewards [1, 2]".to_string()]);

        let replies = handler
            .execute(42, Command::Add("2".to_string()))
            .await
            .unwrap();
        assert_eq!(replies, vec!["No new reward ID found".to_string()]);

        let replies = handler
            .execute(42, Command::Add("none".to_string()))
            .await
            .unwrap();
        assert_eq!(replies, vec![NO_VALID_IDS.to_string()]);

        let replies = handler.execute(42, Command::List).await.unwrap();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].contains("Tier 1"));
        assert!(replies[0].contains("Tier 2"));

        let replies = handler
            .execute(42, Command::Remove("2 7".to_string()))
            .await
            .unwrap();
        assert_eq!(replies, vec!["Removed rewards [2]".to_string()]);

        let replies = handler
            .execute(42, Command::ResetNotifications)
            .await
            .unwrap();
        assert_eq!(replies, vec!["Notifications reset".to_string()]);
    }
}
