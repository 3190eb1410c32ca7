//! Anti-automation challenge: "a + b = ?" with a and b drawn from 1..=10.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::models::ChallengeView;

/// How long an issued question stays answerable
const CHALLENGE_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge {
    pub a: u32,
    pub b: u32,
}

impl Challenge {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            a: rng.gen_range(1..=10),
            b: rng.gen_range(1..=10),
        }
    }

    pub fn expected(&self) -> u32 {
        self.a + self.b
    }

    /// Whether a raw form answer solves this challenge. Surrounding whitespace is ignored.
    pub fn accepts(&self, answer: &str) -> bool {
        answer
            .trim()
            .parse::<i64>()
            .map(|n| n == i64::from(self.expected()))
            .unwrap_or(false)
    }
}

#[derive(Debug)]
struct Pending {
    challenge: Challenge,
    issued_at: DateTime<Utc>,
}

/// A question taken out of the book by a correct answer.
///
/// While held it cannot be answered again. Hand it back with
/// [`ChallengeBook::restore`] if the upload it guarded was rejected.
#[derive(Debug)]
pub struct SolvedChallenge {
    token: String,
    pending: Pending,
}

/// Questions handed out to clients, keyed by an opaque token.
///
/// Each question admits one upload at a time. A wrong answer burns it.
pub struct ChallengeBook {
    pending: Mutex<HashMap<String, Pending>>,
}

impl ChallengeBook {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn issue(&self) -> ChallengeView {
        let challenge = Challenge::generate(&mut rand::thread_rng());
        self.issue_challenge(challenge)
    }

    fn issue_challenge(&self, challenge: Challenge) -> ChallengeView {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let cutoff = now - Duration::minutes(CHALLENGE_TTL_MINUTES);

        let mut pending = self.pending.lock().unwrap();
        pending.retain(|_, p| p.issued_at > cutoff);
        pending.insert(
            token.clone(),
            Pending {
                challenge,
                issued_at: now,
            },
        );

        ChallengeView {
            token,
            a: challenge.a,
            b: challenge.b,
        }
    }

    /// Check an answer and take the question out of the book.
    ///
    /// On failure the old question is dropped and a new one is returned.
    pub fn verify(&self, token: &str, answer: &str) -> Result<SolvedChallenge, ChallengeView> {
        let taken = {
            let mut pending = self.pending.lock().unwrap();
            match pending.remove(token) {
                Some(p) if p.challenge.accepts(answer) => Some(p),
                _ => None,
            }
        };

        match taken {
            Some(pending) => Ok(SolvedChallenge {
                token: token.to_string(),
                pending,
            }),
            None => {
                tracing::debug!("Challenge failed for token {}", token);
                Err(self.issue())
            }
        }
    }

    /// Put a solved question back so the same answer works for the next file.
    /// Keeps its original issue time, so it still expires on schedule.
    pub fn restore(&self, solved: SolvedChallenge) {
        self.pending
            .lock()
            .unwrap()
            .insert(solved.token, solved.pending);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

impl Default for ChallengeBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let c = Challenge::generate(&mut rng);
            assert!((1..=10).contains(&c.a));
            assert!((1..=10).contains(&c.b));
            assert_eq!(c.expected(), c.a + c.b);
        }
    }

    #[test]
    fn test_accepts_only_the_sum() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let c = Challenge::generate(&mut rng);
            assert!(c.accepts(&c.expected().to_string()));
            assert!(c.accepts(&format!(" {} ", c.expected())));
            assert!(!c.accepts(&(c.expected() + 1).to_string()));
            assert!(!c.accepts(&(c.expected() - 1).to_string()));
        }
        let c = Challenge { a: 3, b: 4 };
        assert!(!c.accepts(""));
        assert!(!c.accepts("seven"));
        assert!(!c.accepts("-7"));
    }

    #[test]
    fn test_verify_takes_question_until_restored() {
        let book = ChallengeBook::new();
        let view = book.issue_challenge(Challenge { a: 2, b: 5 });

        let solved = book.verify(&view.token, "7").unwrap();
        assert_eq!(book.len(), 0);

        // a second upload racing on the same answer is turned away
        let next = book.verify(&view.token, "7").unwrap_err();
        assert_ne!(next.token, view.token);

        book.restore(solved);
        assert!(book.verify(&view.token, "7").is_ok());
        assert!(book.verify(&view.token, "7").is_err());
    }

    #[test]
    fn test_verify_wrong_answer_issues_new_question() {
        let book = ChallengeBook::new();
        let view = book.issue_challenge(Challenge { a: 2, b: 5 });

        let next = book.verify(&view.token, "8").unwrap_err();
        assert_ne!(next.token, view.token);
        assert!((1..=10).contains(&next.a));
        assert!((1..=10).contains(&next.b));

        // the burned question cannot be answered any more
        assert!(book.verify(&view.token, "7").is_err());
    }

    #[test]
    fn test_verify_unknown_token() {
        let book = ChallengeBook::new();
        let next = book.verify("nope", "2").unwrap_err();
        assert_eq!(book.len(), 1);
        assert!(book.verify(&next.token, &(next.a + next.b).to_string()).is_ok());
    }
}
