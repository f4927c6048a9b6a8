//! Inbound routing
//!
//! The [`Bot`] receives everything the transport hands it (commands, free
//! text and fired alarms) and routes it to the [`ChatGame`] of the chat
//! concerned. Chats live in a [`Registry`] keyed by chat id; each chat sits
//! behind its own lock, so transitions within a chat are serialized while
//! separate chats progress independently, including while one of them waits
//! on the trivia provider or the messenger. A chat left idle by `/stop` is
//! dropped from the registry and recreated by its next command.
//!
//! No error or panic escapes an entry point: failures are logged and the
//! affected chat is left in whatever state its transition reached.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use dashmap::DashMap;
use web_time::Duration;

use crate::{
    chat::{Author, ChatId, MessageId},
    config::Settings,
    game::{AlarmMessage, ChatGame, Error},
    provider::TriviaProvider,
    session::{Format, Messenger, OutgoingMessage},
};

/// Text sent in answer to `/start`
pub const HELP_TEXT: &str = "/start - show this help
/new   - start a game
/stop  - stop the game
/next  - skip to the next question";

/// Commands understood by the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Show the help text
    Start,
    /// Start a game
    New,
    /// Stop the running game
    Stop,
    /// Skip to a new question
    Next,
}

impl Command {
    /// Parses a command from message text
    ///
    /// A `@botname` suffix and any arguments are ignored. Returns `None` for
    /// anything that is not one of the known commands.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?.strip_prefix('/')?;
        let name = word.split_once('@').map_or(word, |(name, _)| name);
        match name {
            "start" => Some(Self::Start),
            "new" => Some(Self::New),
            "stop" => Some(Self::Stop),
            "next" => Some(Self::Next),
            _ => None,
        }
    }
}

/// A message received from a chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Chat the message was posted in
    pub chat_id: ChatId,
    /// Platform id of the message
    pub message_id: MessageId,
    /// Who sent it
    pub author: Author,
    /// Message text
    pub text: String,
}

/// Trait for scheduling one-shot alarms
///
/// When the delay elapses the implementation must call
/// [`Bot::handle_alarm`] with the same chat id and alarm. Alarms of
/// different chats need not be ordered relative to each other.
pub trait Scheduler {
    /// Schedules `alarm` for `chat_id` to fire once after `delay`
    fn schedule_once(&self, chat_id: ChatId, alarm: AlarmMessage, delay: Duration);
}

/// Concurrent mapping from chat id to that chat's game
#[derive(Debug, Default)]
pub struct Registry {
    chats: DashMap<ChatId, Arc<Mutex<ChatGame>>>,
}

impl Registry {
    /// Returns the chat's game, creating an idle one if needed
    pub fn get_or_create(&self, chat_id: ChatId, settings: Settings) -> Arc<Mutex<ChatGame>> {
        self.chats
            .entry(chat_id)
            .or_insert_with(|| Arc::new(Mutex::new(ChatGame::new(chat_id, settings))))
            .clone()
    }

    /// Returns the chat's game if it has one
    pub fn get(&self, chat_id: ChatId) -> Option<Arc<Mutex<ChatGame>>> {
        self.chats.get(&chat_id).map(|entry| entry.value().clone())
    }

    /// Drops the chat's game if it has no live round and no handler holds it
    ///
    /// Returns whether the chat was removed. A later command recreates it.
    pub fn evict_idle(&self, chat_id: ChatId) -> bool {
        self.chats
            .remove_if(&chat_id, |_, chat| {
                Arc::strong_count(chat) == 1 && !lock(chat).in_game()
            })
            .is_some()
    }

    /// Number of chats currently held
    pub fn len(&self) -> usize {
        self.chats.len()
    }

    /// Whether no chat is held
    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }
}

/// Locks a chat, recovering the game if a previous handler panicked while holding it
fn lock(chat: &Mutex<ChatGame>) -> MutexGuard<'_, ChatGame> {
    chat.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs a handler, logging its error or panic instead of propagating it
fn guarded<F: FnOnce() -> Result<(), Error>>(chat_id: ChatId, handler: F) {
    match catch_unwind(AssertUnwindSafe(handler)) {
        Ok(Ok(())) => {}
        Ok(Err(e @ Error::Unreachable(_))) => {
            tracing::info!(chat = %chat_id, error = %e, "chat unreachable");
        }
        Ok(Err(e @ Error::Provider(_))) => {
            tracing::warn!(chat = %chat_id, error = %e, "round could not start");
        }
        Err(_) => {
            tracing::error!(chat = %chat_id, "handler panicked");
        }
    }
}

/// Routes inbound messages and alarms to per-chat games
#[derive(Debug)]
pub struct Bot<P, M, C> {
    provider: P,
    messenger: M,
    scheduler: C,
    settings: Settings,
    registry: Registry,
}

impl<P: TriviaProvider, M: Messenger, C: Scheduler> Bot<P, M, C> {
    /// Creates a bot with no chats
    pub fn new(provider: P, messenger: M, scheduler: C, settings: Settings) -> Self {
        Self {
            provider,
            messenger,
            scheduler,
            settings,
            registry: Registry::default(),
        }
    }

    /// The chats known to the bot
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The messenger the bot writes through
    pub fn messenger(&self) -> &M {
        &self.messenger
    }

    /// Handles a message posted in a chat
    pub fn handle_message(&self, message: &IncomingMessage) {
        let chat_id = message.chat_id;
        let command = Command::parse(&message.text);
        tracing::debug!(chat = %chat_id, ?command, "message received");

        guarded(chat_id, || match command {
            Some(Command::Start) => {
                self.help(message);
                Ok(())
            }
            Some(Command::New) => {
                let chat = self.registry.get_or_create(chat_id, self.settings);
                let mut game = lock(&chat);
                game.new_game(
                    &self.provider,
                    &self.messenger,
                    self.schedule_for(chat_id),
                    message.message_id,
                )
            }
            Some(Command::Stop) => {
                let Some(chat) = self.registry.get(chat_id) else {
                    return Ok(());
                };
                let result = lock(&chat).stop(&self.messenger);
                drop(chat);
                if self.registry.evict_idle(chat_id) {
                    tracing::debug!(chat = %chat_id, "idle chat evicted");
                }
                result
            }
            Some(Command::Next) => {
                let chat = self.registry.get_or_create(chat_id, self.settings);
                let mut game = lock(&chat);
                game.next(&self.provider, &self.messenger, self.schedule_for(chat_id))
            }
            None => match self.registry.get(chat_id) {
                Some(chat) => {
                    let mut game = lock(&chat);
                    game.receive_guess(
                        &self.provider,
                        &self.messenger,
                        self.schedule_for(chat_id),
                        &message.author,
                        message.message_id,
                        &message.text,
                    )
                }
                None => Ok(()),
            },
        });
    }

    /// Handles an alarm previously handed to the scheduler
    pub fn handle_alarm(&self, chat_id: ChatId, alarm: AlarmMessage) {
        guarded(chat_id, || match self.registry.get(chat_id) {
            Some(chat) => {
                let mut game = lock(&chat);
                game.receive_alarm(
                    &self.provider,
                    &self.messenger,
                    self.schedule_for(chat_id),
                    alarm,
                )
            }
            None => Ok(()),
        });
    }

    fn help(&self, message: &IncomingMessage) {
        let reply = OutgoingMessage::new(message.chat_id, HELP_TEXT, Format::Plain)
            .replying_to(message.message_id);
        if let Err(e) = self.messenger.send_message(&reply) {
            tracing::info!(chat = %message.chat_id, error = %e, "failed to send help");
        }
    }

    fn schedule_for(&self, chat_id: ChatId) -> impl FnMut(AlarmMessage, Duration) + '_ {
        move |alarm, delay| self.scheduler.schedule_once(chat_id, alarm, delay)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::{
        chat::RoundId,
        provider,
        question::{Difficulty, Question, QuestionKind},
        session::DeliveryError,
    };

    #[derive(Default)]
    struct QueueProvider {
        questions: Mutex<VecDeque<Question>>,
    }

    impl QueueProvider {
        fn repeating(text: &str, kind: QuestionKind, answer: &str, count: usize) -> Self {
            Self {
                questions: Mutex::new(
                    std::iter::repeat_with(|| Question::new(text, kind, answer))
                        .take(count)
                        .collect(),
                ),
            }
        }
    }

    impl TriviaProvider for QueueProvider {
        fn fetch_question(&self, _difficulty: Difficulty) -> Result<Question, provider::Error> {
            self.questions
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(provider::Error::Empty)
        }
    }

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<OutgoingMessage>>,
        forbidden: Mutex<Vec<ChatId>>,
    }

    impl Outbox {
        fn texts(&self, chat_id: ChatId) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.chat_id == chat_id)
                .map(|m| m.text.clone())
                .collect()
        }

        fn block(&self, chat_id: ChatId) {
            self.forbidden.lock().unwrap().push(chat_id);
        }

        fn unblock(&self, chat_id: ChatId) {
            self.forbidden.lock().unwrap().retain(|c| *c != chat_id);
        }
    }

    impl Messenger for Outbox {
        fn send_message(&self, message: &OutgoingMessage) -> Result<(), DeliveryError> {
            if self.forbidden.lock().unwrap().contains(&message.chat_id) {
                return Err(DeliveryError::Forbidden);
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct Timers {
        pending: Mutex<Vec<(ChatId, AlarmMessage, Duration)>>,
    }

    impl Scheduler for Timers {
        fn schedule_once(&self, chat_id: ChatId, alarm: AlarmMessage, delay: Duration) {
            self.pending.lock().unwrap().push((chat_id, alarm, delay));
        }
    }

    type TestBot = Bot<QueueProvider, Outbox, Timers>;

    fn bot(provider: QueueProvider) -> TestBot {
        Bot::new(provider, Outbox::default(), Timers::default(), Settings::default())
    }

    fn send(bot: &TestBot, chat: i64, author: Author, text: &str) {
        bot.handle_message(&IncomingMessage {
            chat_id: ChatId::from(chat),
            message_id: MessageId::from(1),
            author,
            text: text.to_string(),
        });
    }

    /// Fires every pending alarm of `chat`, returning how many fired
    fn fire_pending(bot: &TestBot, chat: i64) -> usize {
        let chat_id = ChatId::from(chat);
        let due = {
            let mut pending = bot.scheduler.pending.lock().unwrap();
            let (due, rest): (Vec<_>, Vec<_>) =
                pending.drain(..).partition(|(c, _, _)| *c == chat_id);
            *pending = rest;
            due
        };
        for (_, alarm, _) in &due {
            bot.handle_alarm(chat_id, *alarm);
        }
        due.len()
    }

    fn current_round(bot: &TestBot, chat: i64) -> Option<RoundId> {
        let chat = bot.registry().get(ChatId::from(chat))?;
        let game = lock(&chat);
        game.round().filter(|r| r.in_game()).map(|r| r.id())
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/new@trivia_bot"), Some(Command::New));
        assert_eq!(Command::parse("  /stop now"), Some(Command::Stop));
        assert_eq!(Command::parse("/next"), Some(Command::Next));
        assert_eq!(Command::parse("/unknown"), None);
        assert_eq!(Command::parse("new"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn test_start_sends_help() {
        let bot = bot(QueueProvider::default());
        send(&bot, 1, Author::person("Ana"), "/start");
        assert_eq!(bot.messenger().texts(ChatId::from(1)), vec![HELP_TEXT]);
        assert!(bot.registry().is_empty());
    }

    #[test]
    fn test_full_round_with_timeout_and_restart() {
        let bot = bot(QueueProvider::repeating(
            "Capital of France?",
            QuestionKind::Multiple,
            "Paris",
            2,
        ));
        send(&bot, 1, Author::person("Ana"), "/new");
        let first = current_round(&bot, 1).unwrap();

        // Four clue ticks, then the time out
        for _ in 0..5 {
            assert_eq!(fire_pending(&bot, 1), 1);
        }

        let texts = bot.messenger().texts(ChatId::from(1));
        assert_eq!(texts[0], "Let's start!");
        assert_eq!(texts.iter().filter(|t| t.starts_with("❓")).count(), 4);
        assert!(texts.last().unwrap().starts_with("❌ Nobody guessed it!"));

        let second = current_round(&bot, 1).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_guess_wins_round() {
        let bot = bot(QueueProvider::repeating(
            "2+2=4 (True/False)?",
            QuestionKind::Boolean,
            "True",
            2,
        ));
        send(&bot, 1, Author::person("Ana"), "/new");
        fire_pending(&bot, 1);
        send(&bot, 1, Author::person("Ana"), "yes");

        let texts = bot.messenger().texts(ChatId::from(1));
        assert_eq!(
            texts.last().unwrap(),
            "✅ *Ana* nailed it! The answer is *True/yes*"
        );

        // The stale alarm of the won round does nothing, the new round's first tick asks
        let before = texts.len();
        fire_pending(&bot, 1);
        assert_eq!(bot.messenger().texts(ChatId::from(1)).len(), before + 1);
    }

    #[test]
    fn test_stop_then_new_starts_fresh_round() {
        let bot = bot(QueueProvider::repeating(
            "Capital of France?",
            QuestionKind::Multiple,
            "Paris",
            2,
        ));
        send(&bot, 1, Author::person("Ana"), "/new");
        send(&bot, 1, Author::person("Ana"), "/stop");
        assert!(current_round(&bot, 1).is_none());

        assert_eq!(fire_pending(&bot, 1), 1);
        assert_eq!(
            bot.messenger().texts(ChatId::from(1)),
            vec!["Let's start!", "🛑 Stopped"]
        );

        send(&bot, 1, Author::person("Ana"), "/new");
        assert!(current_round(&bot, 1).is_some());
    }

    #[test]
    fn test_stop_evicts_idle_chat() {
        let bot = bot(QueueProvider::repeating(
            "Capital of France?",
            QuestionKind::Multiple,
            "Paris",
            3,
        ));
        send(&bot, 1, Author::person("Ana"), "/new");
        send(&bot, 2, Author::person("Bo"), "/new");
        assert!(!bot.registry().evict_idle(ChatId::from(1)));
        assert_eq!(bot.registry().len(), 2);

        send(&bot, 1, Author::person("Ana"), "/stop");
        assert_eq!(bot.registry().len(), 1);
        assert!(bot.registry().get(ChatId::from(1)).is_none());

        // The stopped round's tick finds no chat and does nothing
        assert_eq!(fire_pending(&bot, 1), 1);
        assert_eq!(bot.registry().len(), 1);

        send(&bot, 1, Author::person("Ana"), "/new");
        assert!(current_round(&bot, 1).is_some());
        assert_eq!(bot.registry().len(), 2);
    }

    #[test]
    fn test_evict_skips_held_chats() {
        let registry = Registry::default();
        let chat = registry.get_or_create(ChatId::from(1), Settings::default());
        assert!(!registry.evict_idle(ChatId::from(1)));

        drop(chat);
        assert!(registry.evict_idle(ChatId::from(1)));
        assert!(registry.is_empty());
        assert!(!registry.evict_idle(ChatId::from(1)));
    }

    #[test]
    fn test_guess_without_game_is_ignored() {
        let bot = bot(QueueProvider::default());
        send(&bot, 1, Author::person("Ana"), "Paris");
        assert!(bot.messenger().texts(ChatId::from(1)).is_empty());
        assert!(bot.registry().is_empty());
    }

    #[test]
    fn test_blocked_chat_does_not_crash_and_recovers() {
        let bot = bot(QueueProvider::repeating(
            "Capital of France?",
            QuestionKind::Multiple,
            "Paris",
            2,
        ));
        send(&bot, 1, Author::person("Ana"), "/new");
        bot.messenger().block(ChatId::from(1));
        fire_pending(&bot, 1);
        assert!(current_round(&bot, 1).is_none());
        assert_eq!(fire_pending(&bot, 1), 0);

        bot.messenger().unblock(ChatId::from(1));
        send(&bot, 1, Author::person("Ana"), "/new");
        assert!(current_round(&bot, 1).is_some());
    }

    #[test]
    fn test_provider_failure_is_contained() {
        let bot = bot(QueueProvider::default());
        send(&bot, 1, Author::person("Ana"), "/new");
        assert!(current_round(&bot, 1).is_none());
        assert_eq!(bot.messenger().texts(ChatId::from(1)), vec!["Let's start!"]);
    }

    #[test]
    fn test_chats_are_independent() {
        let bot = bot(QueueProvider::repeating(
            "Capital of France?",
            QuestionKind::Multiple,
            "Paris",
            8,
        ));
        std::thread::scope(|scope| {
            for chat in [1, 2] {
                let bot = &bot;
                scope.spawn(move || send(bot, chat, Author::person("Ana"), "/new"));
            }
        });
        assert_eq!(bot.registry().len(), 2);

        send(&bot, 1, Author::person("Ana"), "/stop");
        assert!(current_round(&bot, 1).is_none());
        assert!(current_round(&bot, 2).is_some());

        fire_pending(&bot, 2);
        assert!(
            bot.messenger()
                .texts(ChatId::from(2))
                .last()
                .unwrap()
                .starts_with("❓")
        );
    }

    #[test]
    fn test_poisoned_chat_is_recovered() {
        let bot = bot(QueueProvider::repeating(
            "Capital of France?",
            QuestionKind::Multiple,
            "Paris",
            2,
        ));
        send(&bot, 1, Author::person("Ana"), "/new");
        let chat = bot.registry().get(ChatId::from(1)).unwrap();

        let _ = std::thread::spawn({
            let chat = chat.clone();
            move || {
                let _guard = chat.lock().unwrap();
                panic!("handler failure");
            }
        })
        .join();
        assert!(chat.is_poisoned());

        send(&bot, 1, Author::person("Ana"), "/stop");
        assert!(current_round(&bot, 1).is_none());
    }
}
