// Routing table: which chat phrases in which contexts trigger which command
// First matching route wins, so order matters (queue before skip: "what's next in the queue")

use crate::chat::{IncomingMessage, MessageContext};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Greet,
    CurrentTrack,
    ShowQueue,
    Skip,
}

const DIRECT_MESSAGE: &[MessageContext] = &[MessageContext::DirectMessage];
const ADDRESSED: &[MessageContext] = &[MessageContext::DirectMessage, MessageContext::DirectMention];

#[derive(Debug)]
struct Route {
    pattern: Regex,
    contexts: &'static [MessageContext],
    command: Command,
}

#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Result<Self, regex::Error> {
        let mut router = Self { routes: Vec::new() };
        router.add(exact(&["hello"])?, DIRECT_MESSAGE, Command::Greet);
        router.add(any_of(&["current song", "current"])?, ADDRESSED, Command::CurrentTrack);
        router.add(any_of(&["show queue", "queue"])?, ADDRESSED, Command::ShowQueue);
        router.add(any_of(&["skip", "next"])?, ADDRESSED, Command::Skip);
        Ok(router)
    }

    fn add(&mut self, pattern: Regex, contexts: &'static [MessageContext], command: Command) {
        self.routes.push(Route {
            pattern,
            contexts,
            command,
        });
    }

    pub fn route(&self, message: &IncomingMessage) -> Option<Command> {
        self.routes
            .iter()
            .find(|r| r.contexts.contains(&message.context) && r.pattern.is_match(&message.text))
            .map(|r| r.command)
    }
}

fn alternation(phrases: &[&str]) -> String {
    phrases
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|")
}

/// Whole message must be one of the phrases (case-insensitive)
fn exact(phrases: &[&str]) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"(?i)^\s*(?:{})\s*$", alternation(phrases)))
}

/// Any of the phrases as whole words anywhere in the message
fn any_of(phrases: &[&str]) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation(phrases)))
}
