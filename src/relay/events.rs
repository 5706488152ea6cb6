//! The table of recognized events and how each one is forwarded.
//!
//! Every event the hub relays is listed in [`EventKind`]. Forwarding is a
//! pure function of the kind and the received arguments; the hub never looks
//! at payload shape beyond what [`ForwardRule::UnwrapFirst`] needs.

use serde::Serialize;
use serde_json::Value;

use crate::error::RelayError;

/// How an event's arguments are turned into the broadcast arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardRule {
    /// Forward every argument exactly as received.
    PassThrough,
    /// The producer wraps the record in a one-element array; forward the
    /// record itself as the only argument.
    UnwrapFirst,
}

/// Event names the hub listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    // Chat
    ChatMessage,
    Emote,
    UserJoined,
    UserLeft,
    // Channel stats poller
    FollowerCount,
    ViewerCount,
    LastFollower,
    LastSubscriber,
    // Stream lifecycle
    StreamStart,
    StreamUpdate,
    StreamEnd,
    // Alerts
    NewFollow,
    NewSubscription,
    NewRaid,
    NewCheer,
    // User generated
    PlayAudio,
    StopAudio,
    // Candle voting
    CandleReset,
    CandleStop,
    CandleVote,
    CandleWinner,
    CandleVoteUpdate,
}

impl EventKind {
    pub const ALL: [EventKind; 22] = [
        EventKind::ChatMessage,
        EventKind::Emote,
        EventKind::UserJoined,
        EventKind::UserLeft,
        EventKind::FollowerCount,
        EventKind::ViewerCount,
        EventKind::LastFollower,
        EventKind::LastSubscriber,
        EventKind::StreamStart,
        EventKind::StreamUpdate,
        EventKind::StreamEnd,
        EventKind::NewFollow,
        EventKind::NewSubscription,
        EventKind::NewRaid,
        EventKind::NewCheer,
        EventKind::PlayAudio,
        EventKind::StopAudio,
        EventKind::CandleReset,
        EventKind::CandleStop,
        EventKind::CandleVote,
        EventKind::CandleWinner,
        EventKind::CandleVoteUpdate,
    ];

    /// Wire name of the event.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ChatMessage => "chatMessage",
            EventKind::Emote => "emote",
            EventKind::UserJoined => "userJoined",
            EventKind::UserLeft => "userLeft",
            EventKind::FollowerCount => "followerCount",
            EventKind::ViewerCount => "viewerCount",
            EventKind::LastFollower => "lastFollower",
            EventKind::LastSubscriber => "lastSubscriber",
            EventKind::StreamStart => "streamStart",
            EventKind::StreamUpdate => "streamUpdate",
            EventKind::StreamEnd => "streamEnd",
            EventKind::NewFollow => "newFollow",
            EventKind::NewSubscription => "newSubscription",
            EventKind::NewRaid => "newRaid",
            EventKind::NewCheer => "newCheer",
            EventKind::PlayAudio => "playAudio",
            EventKind::StopAudio => "stopAudio",
            EventKind::CandleReset => "candleReset",
            EventKind::CandleStop => "candleStop",
            EventKind::CandleVote => "candleVote",
            EventKind::CandleWinner => "candleWinner",
            EventKind::CandleVoteUpdate => "candleVoteUpdate",
        }
    }

    /// Look up an event by its wire name. Names are case-sensitive.
    pub fn from_name(name: &str) -> Option<EventKind> {
        EventKind::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    pub fn forward_rule(self) -> ForwardRule {
        match self {
            EventKind::ChatMessage
            | EventKind::LastFollower
            | EventKind::LastSubscriber
            | EventKind::StreamStart
            | EventKind::StreamUpdate => ForwardRule::UnwrapFirst,
            _ => ForwardRule::PassThrough,
        }
    }

    /// Compute the arguments to broadcast for this event.
    ///
    /// `UnwrapFirst` events require a first argument. If it is an array its
    /// first element is forwarded; any other value is forwarded unchanged.
    /// A missing argument or an empty array is rejected.
    pub fn forward(self, args: Vec<Value>) -> Result<Vec<Value>, RelayError> {
        match self.forward_rule() {
            ForwardRule::PassThrough => Ok(args),
            ForwardRule::UnwrapFirst => {
                let first = args
                    .into_iter()
                    .next()
                    .ok_or_else(|| self.malformed("missing first argument"))?;
                match first {
                    Value::Array(items) => items
                        .into_iter()
                        .next()
                        .map(|record| vec![record])
                        .ok_or_else(|| self.malformed("first argument is an empty array")),
                    record => Ok(vec![record]),
                }
            }
        }
    }

    /// Short human-readable description of a forwarded event for the log.
    /// Never fails: absent fields render as `?`.
    pub fn summary(self, args: &[Value]) -> String {
        let arg = |i: usize| args.get(i);
        match self {
            EventKind::ChatMessage => field(arg(0), "message"),
            EventKind::Emote
            | EventKind::UserJoined
            | EventKind::UserLeft
            | EventKind::FollowerCount
            | EventKind::ViewerCount
            | EventKind::PlayAudio => scalar(arg(0)),
            EventKind::LastFollower | EventKind::LastSubscriber => field(arg(0), "login"),
            EventKind::StreamStart | EventKind::StreamUpdate => field(arg(0), "id"),
            EventKind::NewFollow => field(arg(0), "user"),
            EventKind::NewSubscription | EventKind::NewCheer => field(arg(0), "username"),
            EventKind::NewRaid => format!("{}: {}", scalar(arg(0)), scalar(arg(2))),
            EventKind::CandleReset | EventKind::CandleStop | EventKind::CandleVote => {
                scalar(arg(0))
            }
            EventKind::StreamEnd
            | EventKind::StopAudio
            | EventKind::CandleWinner
            | EventKind::CandleVoteUpdate => String::new(),
        }
    }

    fn malformed(self, reason: &str) -> RelayError {
        RelayError::MalformedPayload {
            event: self.as_str().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn scalar(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "?".to_string(),
        Some(other) => other.to_string(),
    }
}

fn field(value: Option<&Value>, key: &str) -> String {
    scalar(value.and_then(|v| v.get(key)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn names_round_trip_through_table() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn serde_name_matches_wire_name() {
        for kind in EventKind::ALL {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.as_str()));
        }
    }

    #[test]
    fn unknown_and_miscased_names_are_rejected() {
        assert_eq!(EventKind::from_name("chatmessage"), None);
        assert_eq!(EventKind::from_name("disconnect"), None);
        assert_eq!(EventKind::from_name(""), None);
    }

    #[test]
    fn unwrap_events() {
        let unwrapped: Vec<_> = EventKind::ALL
            .into_iter()
            .filter(|k| k.forward_rule() == ForwardRule::UnwrapFirst)
            .map(EventKind::as_str)
            .collect();
        assert_eq!(
            unwrapped,
            ["chatMessage", "lastFollower", "lastSubscriber", "streamStart", "streamUpdate"]
        );
    }

    #[test]
    fn stream_start_unwraps_array() {
        let out = EventKind::StreamStart
            .forward(vec![json!([{"id": "s1"}])])
            .unwrap();
        assert_eq!(out, vec![json!({"id": "s1"})]);
    }

    #[test]
    fn unwrap_keeps_bare_record() {
        let msg = json!({"user": "alice", "message": "hi"});
        let out = EventKind::ChatMessage.forward(vec![msg.clone()]).unwrap();
        assert_eq!(out, vec![msg]);
    }

    #[test]
    fn unwrap_drops_trailing_arguments() {
        let out = EventKind::LastFollower
            .forward(vec![json!([{"login": "bob"}, {"login": "eve"}]), json!(1)])
            .unwrap();
        assert_eq!(out, vec![json!({"login": "bob"})]);
    }

    #[test]
    fn unwrap_without_arguments_is_rejected() {
        let err = EventKind::StreamUpdate.forward(vec![]).unwrap_err();
        assert!(matches!(err, RelayError::MalformedPayload { ref event, .. } if event == "streamUpdate"));
    }

    #[test]
    fn unwrap_of_empty_array_is_rejected() {
        let err = EventKind::LastSubscriber.forward(vec![json!([])]).unwrap_err();
        assert_eq!(err.code(), "MALFORMED_PAYLOAD");
    }

    #[test]
    fn pass_through_keeps_all_arguments() {
        let args = vec![
            json!({"username": "carol"}),
            json!({"tier": "1000"}),
            json!(true),
            json!(false),
            json!("thanks"),
        ];
        let out = EventKind::NewSubscription.forward(args.clone()).unwrap();
        assert_eq!(out, args);
    }

    #[test]
    fn pass_through_accepts_no_arguments() {
        assert!(EventKind::StreamEnd.forward(vec![]).unwrap().is_empty());
        assert!(EventKind::StopAudio.forward(vec![]).unwrap().is_empty());
    }

    #[test]
    fn pass_through_does_not_validate_shape() {
        let out = EventKind::ViewerCount.forward(vec![json!("lots")]).unwrap();
        assert_eq!(out, vec![json!("lots")]);
    }

    #[test]
    fn summaries() {
        assert_eq!(
            EventKind::ChatMessage.summary(&[json!({"user": "a", "message": "hi"})]),
            "hi"
        );
        assert_eq!(EventKind::ViewerCount.summary(&[json!(42)]), "42");
        assert_eq!(
            EventKind::NewRaid.summary(&[json!("dave"), json!({}), json!(12)]),
            "dave: 12"
        );
        assert_eq!(EventKind::NewFollow.summary(&[json!({"user": "erin"}), json!({})]), "erin");
        assert_eq!(EventKind::StreamStart.summary(&[]), "?");
        assert_eq!(EventKind::StopAudio.summary(&[]), "");
    }
}
