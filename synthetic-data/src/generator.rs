//! Synthetic day generator.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use search_loader_shared::{Event, Owner, SyntheticDay};
use tracing::debug;

/// Number of days generated when no count is given.
pub const DEFAULT_DAY_COUNT: usize = 5000;

pub const MIN_EVENTS: usize = 1;
pub const MAX_EVENTS: usize = 6;
pub const MIN_WEIGHT: i32 = 14;
pub const MAX_WEIGHT: i32 = 16;

const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Barbara", "Claude", "Donald", "Edsger", "Frances", "Grace", "Hedy", "Ivan",
    "Joan", "John", "Katherine", "Ken", "Leslie", "Margaret", "Niklaus", "Radia", "Shafi",
    "Tim",
];

const LAST_NAMES: &[&str] = &[
    "Allen", "Babbage", "Backus", "Cerf", "Dijkstra", "Hamilton", "Hopper", "Johnson", "Kahn",
    "Knuth", "Lamarr", "Lamport", "Liskov", "Lovelace", "Perlman", "Ritchie", "Shannon",
    "Sutherland", "Thompson", "Wirth",
];

const MAIL_DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "mail.test"];

const CATEGORIES: &[&str] = &[
    "Archery",
    "Badminton",
    "Bowling",
    "Chess",
    "Climbing",
    "Cycling",
    "Fencing",
    "Golf",
    "Rowing",
    "Swimming",
];

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, words: &'a [&'a str]) -> &'a str {
    words.choose(rng).copied().unwrap_or_default()
}

fn generate_owner<R: Rng + ?Sized>(rng: &mut R) -> Owner {
    let first_name = pick(rng, FIRST_NAMES);
    let last_name = pick(rng, LAST_NAMES);
    let domain = pick(rng, MAIL_DOMAINS);

    Owner {
        email: format!("{}.{}@{}", first_name, last_name, domain).to_lowercase(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
    }
}

/// Events fall within the 24 hours after `day_millis`, never after `now_millis`,
/// and are returned in timestamp order.
fn generate_events<R: Rng + ?Sized>(rng: &mut R, day_millis: i64, now_millis: i64) -> Vec<Event> {
    let count = rng.gen_range(MIN_EVENTS..=MAX_EVENTS);
    let mut events: Vec<Event> = (0..count)
        .map(|_| {
            let at = (day_millis + rng.gen_range(0..DAY_MILLIS)).min(now_millis);
            Event {
                timestamp_event: millis_to_datetime(at),
                weight: rng.gen_range(MIN_WEIGHT..=MAX_WEIGHT),
            }
        })
        .collect();
    events.sort_by_key(|e| e.timestamp_event);
    events
}

/// Generate `count` days using the thread-local RNG.
pub fn generate(count: usize) -> Vec<SyntheticDay> {
    generate_with_rng(count, &mut rand::thread_rng())
}

/// Generate `count` days from the given RNG.
///
/// Every timestamp has millisecond precision so it survives a BSON round trip
/// unchanged. `timestamp_day` is any instant between the Unix epoch and now.
pub fn generate_with_rng<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<SyntheticDay> {
    generate_until(count, rng, Utc::now().timestamp_millis())
}

fn generate_until<R: Rng + ?Sized>(count: usize, rng: &mut R, now_millis: i64) -> Vec<SyntheticDay> {
    let now_millis = now_millis.max(1);
    let days: Vec<SyntheticDay> = (0..count)
        .map(|_| {
            let day_millis = rng.gen_range(0..now_millis);
            SyntheticDay {
                id: None,
                timestamp_day: millis_to_datetime(day_millis),
                category: pick(rng, CATEGORIES).to_string(),
                owner: generate_owner(rng),
                events: generate_events(rng, day_millis, now_millis),
            }
        })
        .collect();

    debug!(count = days.len(), "Generated synthetic days");
    days
}
