use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use moments_db::Database;
use moments_db::queries::BALLOON_RADIUS;
use moments_types::models::{Location, MediaContent, Moment, MomentId};
use moments_types::validate::{LATITUDE_LIMIT, LONGITUDE_LIMIT};

const USERS: &[&str] = &["James1", "Sadie1", "Frank1", "Maria01", "Okoro22", "Lena_77"];

const MESSAGES: &[&str] = &[
    "Look up!",
    "Best coffee in town",
    "We met here",
    "Left you something",
    "",
];

/// Days back from `now` a generated moment may be dated.
const MAX_AGE_DAYS: i64 = 30;

pub struct Generator<R: Rng> {
    rng: R,
    media_dir: String,
    center: Location,
    now: DateTime<Utc>,
}

/// Inputs for one `leave_moment` call.
pub struct Draft {
    pub moment: Moment,
    pub media: Vec<MediaContent>,
    pub recipients: Vec<String>,
}

impl<R: Rng> Generator<R> {
    pub fn new(rng: R, media_dir: impl Into<String>, center: Location, now: DateTime<Utc>) -> Self {
        Self {
            rng,
            media_dir: media_dir.into(),
            center,
            now,
        }
    }

    pub fn fill(&mut self, db: &Database, count: usize) -> anyhow::Result<Vec<MomentId>> {
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let draft = self.draft()?;
            let id = db.leave_moment(&draft.moment, draft.media, &draft.recipients)?;
            debug!(moment_id = id, recipients = draft.recipients.len(), "Seeded moment");
            ids.push(id);
        }
        Ok(ids)
    }

    pub fn draft(&mut self) -> anyhow::Result<Draft> {
        let sender = self.pick(USERS);
        let location = self.location()?;

        // open, hidden or private with equal odds
        let (public, hidden) = match self.rng.random_range(0..3) {
            0 => (true, false),
            1 => (true, true),
            _ => (false, false),
        };
        let age = Duration::minutes(self.rng.random_range(0..MAX_AGE_DAYS * 24 * 60));
        let moment = Moment::new(sender, location, public, hidden, self.now - age)?;

        let mut media = Vec::new();
        for kind in 0..=3i64 {
            if !self.rng.random_bool(0.4) {
                continue;
            }
            let dir = match kind {
                0 => String::new(),
                1 => format!("{}/{}-{}.jpg", self.media_dir, sender, self.rng.random_range(0..10_000)),
                2 => format!("{}/{}-{}.mp4", self.media_dir, sender, self.rng.random_range(0..10_000)),
                _ => format!("{}/{}-{}.bin", self.media_dir, sender, self.rng.random_range(0..10_000)),
            };
            let message = self.pick(MESSAGES);
            media.push(MediaContent::new(message, kind, dir)?);
        }

        let recipients = if moment.is_targeted() {
            let mut others: Vec<String> = USERS
                .iter()
                .filter(|u| **u != sender)
                .map(|u| u.to_string())
                .collect();
            others.shuffle(&mut self.rng);
            let keep = self.rng.random_range(1..=3);
            others.truncate(keep);
            others
        } else {
            Vec::new()
        };

        Ok(Draft {
            moment,
            media,
            recipients,
        })
    }

    fn pick(&mut self, from: &[&'static str]) -> &'static str {
        from[self.rng.random_range(0..from.len())]
    }

    fn location(&mut self) -> anyhow::Result<Location> {
        let lat = self.center.latitude() + self.rng.random_range(-BALLOON_RADIUS..=BALLOON_RADIUS);
        let lon = self.center.longitude() + self.rng.random_range(-BALLOON_RADIUS..=BALLOON_RADIUS);
        Ok(Location::new(
            lat.clamp(-LATITUDE_LIMIT, LATITUDE_LIMIT),
            lon.clamp(-LONGITUDE_LIMIT, LONGITUDE_LIMIT),
        )?)
    }
}
