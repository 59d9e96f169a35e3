//! # Captcha
//!
//! The pick-the-emoji challenge shown before registration. A pending
//! challenge lives in the TTL cache keyed by user id, so abandoned captchas
//! expire instead of accumulating; passes are persisted by the caller and
//! stay valid for two weeks (`db::has_recent_captcha_pass`).

use crate::cache::{BotCaches, PendingCaptcha, CAPTCHA_TTL};
use rand::seq::IndexedRandom;

/// Word/emoji pairs the challenge draws from
pub const CAPTCHA_VARIANTS: [(&str, &str); 6] = [
    ("apple", "🍎"),
    ("car", "🚗"),
    ("candy", "🍬"),
    ("ball", "⚽"),
    ("chair", "🪑"),
    ("watch", "⌚"),
];

/// All selectable emojis, in keyboard order
pub fn captcha_options() -> Vec<&'static str> {
    CAPTCHA_VARIANTS.iter().map(|(_, emoji)| *emoji).collect()
}

/// Outcome of checking a user's answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptchaOutcome {
    /// The right emoji was picked
    Passed,
    /// A wrong emoji was picked; the challenge stays pending
    Wrong,
    /// No challenge is pending (expired or never issued)
    NoPending,
}

/// Issue a fresh challenge for the user and return it.
///
/// Any previous pending challenge for the user is replaced.
pub fn issue_challenge(caches: &BotCaches, user_id: i64) -> PendingCaptcha {
    let (word, emoji) = CAPTCHA_VARIANTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(CAPTCHA_VARIANTS[0]);

    let pending = PendingCaptcha {
        word: word.to_string(),
        expected: emoji.to_string(),
    };
    caches.captcha.insert(user_id, pending.clone(), CAPTCHA_TTL);
    pending
}

/// Check the emoji the user picked against their pending challenge.
///
/// A pass consumes the pending entry; a wrong answer leaves it in place so
/// the user can try again on the same keyboard.
pub fn verify_answer(caches: &BotCaches, user_id: i64, answer: &str) -> CaptchaOutcome {
    match caches.captcha.get(&user_id) {
        Some(pending) if pending.expected == answer => {
            caches.captcha.remove(&user_id);
            CaptchaOutcome::Passed
        }
        Some(_) => CaptchaOutcome::Wrong,
        None => CaptchaOutcome::NoPending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_stores_pending_challenge() {
        let caches = BotCaches::new();
        let pending = issue_challenge(&caches, 42);

        assert!(CAPTCHA_VARIANTS
            .iter()
            .any(|(word, emoji)| *word == pending.word && *emoji == pending.expected));
        assert_eq!(caches.captcha.get(&42), Some(pending));
    }

    #[test]
    fn test_correct_answer_passes_and_consumes() {
        let caches = BotCaches::new();
        let pending = issue_challenge(&caches, 42);

        assert_eq!(
            verify_answer(&caches, 42, &pending.expected),
            CaptchaOutcome::Passed
        );
        // Consumed: a second attempt has nothing to check against
        assert_eq!(
            verify_answer(&caches, 42, &pending.expected),
            CaptchaOutcome::NoPending
        );
    }

    #[test]
    fn test_wrong_answer_keeps_challenge_pending() {
        let caches = BotCaches::new();
        let pending = issue_challenge(&caches, 42);
        let wrong = CAPTCHA_VARIANTS
            .iter()
            .map(|(_, emoji)| *emoji)
            .find(|emoji| *emoji != pending.expected)
            .unwrap();

        assert_eq!(verify_answer(&caches, 42, wrong), CaptchaOutcome::Wrong);
        assert_eq!(
            verify_answer(&caches, 42, &pending.expected),
            CaptchaOutcome::Passed
        );
    }

    #[test]
    fn test_reissue_replaces_challenge() {
        let caches = BotCaches::new();
        issue_challenge(&caches, 42);
        let second = issue_challenge(&caches, 42);
        assert_eq!(caches.captcha.get(&42), Some(second));
        assert_eq!(caches.captcha.len(), 1);
    }
}
