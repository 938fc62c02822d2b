//! Offline keyword model.
//!
//! Each label owns a short list of cue words. A label's logit is the number of cue hits scaled
//! by [`CUE_WEIGHT`]; Neutral carries a constant bias so text without cues stays neutral.

use super::{ClassifierError, Emotion, EmotionModel};
use async_trait::async_trait;

const CUE_WEIGHT: f32 = 2.5;
const NEUTRAL_BIAS: f32 = 1.0;

const LEXICON: &[(Emotion, &[&str])] = &[
    (
        Emotion::Admiration,
        &[
            "admire",
            "admired",
            "amazing",
            "awesome",
            "brilliant",
            "impressive",
            "incredible",
            "wonderful",
            "excellent",
            "fantastic",
        ],
    ),
    (
        Emotion::Amusement,
        &[
            "funny",
            "hilarious",
            "lol",
            "haha",
            "lmao",
            "amusing",
            "laughed",
            "laughing",
        ],
    ),
    (Emotion::Anger, &["angry", "furious", "rage", "outraged", "livid", "mad", "hate"]),
    (
        Emotion::Annoyance,
        &[
            "annoyed",
            "annoying",
            "irritated",
            "irritating",
            "frustrated",
            "frustrating",
            "ugh",
        ],
    ),
    (Emotion::Approval, &["agree", "approve", "approved", "support", "correct", "right", "yes"]),
    (Emotion::Caring, &["care", "caring", "hope", "hug", "support", "safe", "comfort"]),
    (Emotion::Confusion, &["confused", "confusing", "unclear", "puzzled", "huh", "understand"]),
    (Emotion::Curiosity, &["curious", "wonder", "wondering", "why", "how", "interested"]),
    (Emotion::Desire, &["want", "wish", "crave", "desire", "longing", "need"]),
    (
        Emotion::Disappointment,
        &[
            "disappointed",
            "disappointing",
            "letdown",
            "unfortunately",
            "failed",
        ],
    ),
    (Emotion::Disapproval, &["disagree", "disapprove", "wrong", "unacceptable", "shouldn't"]),
    (Emotion::Disgust, &["disgusting", "gross", "revolting", "disgusted", "nasty", "vile"]),
    (Emotion::Embarrassment, &["embarrassed", "embarrassing", "awkward", "ashamed", "humiliated"]),
    (Emotion::Excitement, &["excited", "exciting", "thrilled", "can't wait", "pumped", "eager"]),
    (Emotion::Fear, &["afraid", "scared", "terrified", "frightened", "fear", "horrified"]),
    (Emotion::Gratitude, &["thanks", "thank", "grateful", "thankful", "appreciate", "appreciated"]),
    (Emotion::Grief, &["grief", "grieving", "mourning", "funeral", "passed", "loss"]),
    (Emotion::Joy, &["happy", "joy", "joyful", "glad", "delighted", "cheerful", "great", "good"]),
    (Emotion::Love, &["love", "loved", "loving", "adore", "beloved", "sweetheart"]),
    (Emotion::Nervousness, &["nervous", "anxious", "worried", "worry", "uneasy", "stressed"]),
    (Emotion::Optimism, &["hopeful", "optimistic", "hopefully", "looking forward", "better"]),
    (Emotion::Pride, &["proud", "pride", "accomplished", "achievement"]),
    (Emotion::Realization, &["realized", "realize", "noticed", "turns out", "apparently"]),
    (Emotion::Relief, &["relieved", "relief", "phew", "finally"]),
    (Emotion::Remorse, &["sorry", "regret", "apologize", "apologies", "guilty"]),
    (
        Emotion::Sadness,
        &[
            "sad",
            "unhappy",
            "depressed",
            "miserable",
            "crying",
            "heartbroken",
            "upset",
        ],
    ),
    (Emotion::Surprise, &["surprised", "surprising", "wow", "shocked", "unexpected", "omg"]),
];

/// Deterministic keyword-driven logits; needs no network or model weights.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconEmotionModel;

impl LexiconEmotionModel {
    /// Construct the keyword model.
    pub const fn new() -> Self {
        Self
    }

    fn score(text: &str) -> Vec<f32> {
        let normalized = normalize(text);
        let words: Vec<&str> = normalized.split_whitespace().collect();
        let padded = format!(" {} ", words.join(" "));

        let mut logits = vec![0.0_f32; Emotion::COUNT];
        for (emotion, cues) in LEXICON {
            let hits = cues
                .iter()
                .filter(|cue| {
                    if cue.contains(' ') {
                        padded.contains(&format!(" {cue} "))
                    } else {
                        words.contains(cue)
                    }
                })
                .count();
            logits[emotion.index()] = hits as f32 * CUE_WEIGHT;
        }
        logits[Emotion::Neutral.index()] = NEUTRAL_BIAS;
        logits
    }
}

fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '\'' {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect()
}

#[async_trait]
impl EmotionModel for LexiconEmotionModel {
    async fn logits(&self, text: &str) -> Result<Vec<f32>, ClassifierError> {
        Ok(Self::score(text))
    }

    fn name(&self) -> &str {
        "lexicon"
    }
}
