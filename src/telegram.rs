//! Telegram transport
//!
//! Maps teloxide updates onto controller events and sends replies and
//! scheduled reminders back through the Bot API.

use crate::config::Config;
use crate::controller::{ConversationController, Inbound};
use crate::error::Result;
use crate::scheduler::{Delivery, ReminderScheduler};
use crate::session::UserId;
use async_trait::async_trait;
use std::error::Error;
use std::sync::{Arc, Mutex, PoisonError};
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ReplyParameters, User};
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

pub type HandlerResult = std::result::Result<(), Box<dyn Error + Send + Sync>>;

/// Controller shared between dispatcher workers
pub type SharedController = Arc<Mutex<ConversationController<ReminderScheduler>>>;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
pub enum Command {
    #[command(description = "настроить ежедневное напоминание")]
    Start,
}

/// Sends reminders as plain Telegram messages
#[derive(Clone)]
pub struct TelegramDelivery {
    bot: Bot,
}

impl TelegramDelivery {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Delivery for TelegramDelivery {
    async fn deliver(&self, target: UserId, text: &str) -> Result<()> {
        let chat = ChatId::from(teloxide::types::UserId(target.0));
        self.bot.send_message(chat, text).await?;
        Ok(())
    }
}

fn user_id(user: &User) -> UserId {
    UserId(user.id.0)
}

/// Translate a message into a controller event
pub fn inbound_for(msg: &Message, cmd: Option<&Command>) -> Option<Inbound> {
    let user = msg.from.as_ref()?;
    let event = match cmd {
        Some(Command::Start) => Inbound::Start {
            user: user_id(user),
            display_name: user.full_name(),
        },
        None => Inbound::Text {
            user: user_id(user),
            text: msg.text().unwrap_or_default().to_string(),
        },
    };
    Some(event)
}

/// Quote the user's message so group chats show what is being answered
pub fn reply_to(msg: &Message) -> ReplyParameters {
    ReplyParameters::new(msg.id)
}

async fn reply(bot: &Bot, msg: &Message, controller: &SharedController, inbound: Inbound) -> HandlerResult {
    let text = {
        let mut controller = controller.lock().unwrap_or_else(PoisonError::into_inner);
        controller.handle(inbound)
    };
    bot.send_message(msg.chat.id, text)
        .reply_parameters(reply_to(msg))
        .await?;
    Ok(())
}

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    controller: SharedController,
) -> HandlerResult {
    match inbound_for(&msg, Some(&cmd)) {
        Some(inbound) => reply(&bot, &msg, &controller, inbound).await,
        None => {
            debug!("Ignoring {:?} without sender in chat {}", cmd, msg.chat.id);
            Ok(())
        }
    }
}

pub async fn message_handler(bot: Bot, msg: Message, controller: SharedController) -> HandlerResult {
    match inbound_for(&msg, None) {
        Some(inbound) => reply(&bot, &msg, &controller, inbound).await,
        None => {
            debug!("Ignoring message without sender in chat {}", msg.chat.id);
            Ok(())
        }
    }
}

pub fn schema() -> UpdateHandler<Box<dyn Error + Send + Sync + 'static>> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(Update::filter_message().endpoint(message_handler))
}

/// Run the bot until Ctrl-C
pub async fn run(config: Config) -> Result<()> {
    let bot = Bot::new(&config.bot_token);

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {}", e);
    }

    if config.drop_pending_updates {
        bot.delete_webhook().drop_pending_updates(true).await?;
        debug!("Dropped pending updates");
    }

    let scheduler = ReminderScheduler::new(
        Arc::new(TelegramDelivery::new(bot.clone())),
        config.tick_interval(),
    );
    scheduler.start();

    let controller: SharedController =
        Arc::new(Mutex::new(ConversationController::new(scheduler)));

    info!("Bot started");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![controller])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ConversationState;
    use std::time::Duration;
    use teloxide::types::Me;

    #[test]
    fn test_parse_start_command() {
        assert_eq!(Command::parse("/start", "reminder_bot").unwrap(), Command::Start);
        assert_eq!(
            Command::parse("/start@reminder_bot", "reminder_bot").unwrap(),
            Command::Start
        );
        assert!(Command::parse("/stop", "reminder_bot").is_err());
        assert!(Command::parse("19:30", "reminder_bot").is_err());
    }

    #[test]
    fn test_command_descriptions() {
        let help = Command::descriptions().to_string();
        assert!(help.contains("/start"));
    }

    fn message(json: serde_json::Value) -> Message {
        serde_json::from_value(json).unwrap()
    }

    fn private_text(text: &str) -> Message {
        message(serde_json::json!({
            "message_id": 10,
            "date": 1_705_312_800,
            "chat": { "id": 42, "type": "private", "first_name": "Jane", "last_name": "Doe" },
            "from": { "id": 42, "is_bot": false, "first_name": "Jane", "last_name": "Doe" },
            "text": text
        }))
    }

    #[test]
    fn test_inbound_for_start() {
        let msg = private_text("/start");
        assert_eq!(
            inbound_for(&msg, Some(&Command::Start)),
            Some(Inbound::Start {
                user: UserId(42),
                display_name: "Jane Doe".to_string(),
            })
        );
    }

    #[test]
    fn test_inbound_for_text() {
        let msg = private_text("19:30");
        assert_eq!(
            inbound_for(&msg, None),
            Some(Inbound::Text {
                user: UserId(42),
                text: "19:30".to_string(),
            })
        );
    }

    #[test]
    fn test_reply_quotes_incoming_message() {
        let msg = private_text("19:30");
        assert_eq!(reply_to(&msg).message_id, msg.id);
        assert_eq!(reply_to(&msg).message_id.0, 10);
    }

    #[test]
    fn test_inbound_for_channel_post_without_sender() {
        let msg = message(serde_json::json!({
            "message_id": 11,
            "date": 1_705_312_800,
            "chat": { "id": -100123, "type": "channel", "title": "News" },
            "text": "hello"
        }));
        assert_eq!(inbound_for(&msg, None), None);
    }

    fn update(update_id: i32, text: &str) -> Update {
        // Update's custom Deserialize does not round-trip through serde_json::Value
        serde_json::from_str(&serde_json::json!({
            "update_id": update_id,
            "message": {
                "message_id": update_id,
                "date": 1_705_312_800,
                "chat": { "id": 42, "type": "private", "first_name": "Jane" },
                "from": { "id": 42, "is_bot": false, "first_name": "Jane" },
                "text": text
            }
        }).to_string())
        .unwrap()
    }

    fn me() -> Me {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "is_bot": true,
            "first_name": "Reminder",
            "username": "reminder_bot",
            "can_join_groups": true,
            "can_read_all_group_messages": false,
            "supports_inline_queries": false,
            "can_connect_to_business": false,
            "has_main_web_app": false
        }))
        .unwrap()
    }

    struct NullDelivery;

    #[async_trait]
    impl Delivery for NullDelivery {
        async fn deliver(&self, _target: UserId, _text: &str) -> Result<()> {
            Ok(())
        }
    }

    /// Runs one update through the real dispatch tree. The Bot API is
    /// unreachable, so replies fail after the controller has seen the event.
    async fn route(controller: &SharedController, update_id: i32, text: &str) {
        let bot = Bot::new(Config::for_test().bot_token)
            .set_api_url("http://127.0.0.1:9/".parse().unwrap());
        let _ = schema()
            .dispatch(dptree::deps![bot, me(), update(update_id, text), controller.clone()])
            .await;
    }

    fn state(controller: &SharedController) -> Option<ConversationState> {
        let controller = controller.lock().unwrap();
        controller.sessions().get(UserId(42)).map(|s| s.state)
    }

    #[tokio::test]
    async fn test_schema_routes_commands_and_text() {
        let scheduler = ReminderScheduler::new(Arc::new(NullDelivery), Duration::from_secs(60));
        let controller: SharedController =
            Arc::new(Mutex::new(ConversationController::new(scheduler)));

        // Not our command: plain text with no session yet
        route(&controller, 1, "/help").await;
        assert_eq!(state(&controller), None);

        route(&controller, 2, "/start").await;
        assert_eq!(state(&controller), Some(ConversationState::AwaitingTime));

        route(&controller, 3, "07:30").await;
        assert!(matches!(
            state(&controller),
            Some(ConversationState::AwaitingMessage { .. })
        ));

        // Addressed to another bot: taken as the reminder text, not a restart
        route(&controller, 4, "/start@otherbot").await;
        assert_eq!(state(&controller), None);

        let controller = controller.lock().unwrap();
        assert_eq!(controller.sink().len(), 1);
    }

    #[tokio::test]
    async fn test_schema_start_for_this_bot_restarts() {
        let scheduler = ReminderScheduler::new(Arc::new(NullDelivery), Duration::from_secs(60));
        let controller: SharedController =
            Arc::new(Mutex::new(ConversationController::new(scheduler)));

        route(&controller, 1, "/start").await;
        route(&controller, 2, "07:30").await;
        route(&controller, 3, "/start@reminder_bot").await;

        assert_eq!(state(&controller), Some(ConversationState::AwaitingTime));
        assert!(controller.lock().unwrap().sink().is_empty());
    }
}
