//! Print-treatment detection from listing titles.
//!
//! Ordered keyword rules, most specific first; the first rule that fires
//! wins, so detection is deterministic for a given title and product kind.
//! Sealed products use their own vocabulary: "foil" inside a box title
//! refers to the contents, not the product.

use market_core::{ProductKind, Treatment};

use crate::tokens::{contains_word, words};

/// Classifies listing titles into print treatments.
#[derive(Debug, Clone, Default)]
pub struct TreatmentClassifier;

impl TreatmentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Detect the treatment for a title, scoped by product kind. Never
    /// fails; titles no rule matches come back as `Unclassified`.
    pub fn detect(&self, title: &str, product: ProductKind) -> Treatment {
        let title_words = words(title);
        if title_words.is_empty() {
            return Treatment::Unclassified;
        }
        if product.is_sealed_product() {
            detect_sealed(&title_words, product)
        } else {
            detect_single(title, &title_words)
        }
    }

    /// [`detect`](Self::detect) plus the marketplace coercion: NFT
    /// platforms rarely put the treatment in the title, so an otherwise
    /// unclassified listing from one labels as `Digital`.
    pub fn detect_for_platform(
        &self,
        title: &str,
        product: ProductKind,
        platform: &str,
    ) -> Treatment {
        let treatment = self.detect(title, product);
        if !treatment.is_classified() && platform.eq_ignore_ascii_case("opensea") {
            return Treatment::Digital;
        }
        treatment
    }
}

fn detect_single(raw_title: &str, title_words: &[String]) -> Treatment {
    if contains_word(title_words, "ocm")
        || contains_word(title_words, "serialized")
        || has_serial_fraction(raw_title)
    {
        return Treatment::OcmSerialized;
    }
    if contains_word(title_words, "formless") {
        return Treatment::FormlessFoil;
    }
    // "non-foil" normalizes to ["non", "foil"] and means paper.
    if title_words.windows(2).any(|w| w[0] == "non" && w[1] == "foil") {
        return Treatment::ClassicPaper;
    }
    if contains_word(title_words, "foil") {
        return Treatment::ClassicFoil;
    }
    if contains_word(title_words, "paper") {
        return Treatment::ClassicPaper;
    }
    if contains_word(title_words, "nft") || contains_word(title_words, "digital") {
        return Treatment::Digital;
    }
    Treatment::Unclassified
}

fn detect_sealed(title_words: &[String], product: ProductKind) -> Treatment {
    let kind_word = product.label().to_lowercase();
    if contains_word(title_words, "sealed")
        || contains_word(title_words, "unopened")
        || contains_word(title_words, "nib")
        || contains_word(title_words, &kind_word)
    {
        return Treatment::Sealed;
    }
    Treatment::Unclassified
}

/// Serial-numbered cards carry an `N/M` fraction in the title ("12/99",
/// "#4/50").
fn has_serial_fraction(title: &str) -> bool {
    title.split_whitespace().any(|raw| {
        let tok = raw.trim_start_matches('#');
        match tok.split_once('/') {
            Some((num, den)) => {
                !num.is_empty()
                    && !den.is_empty()
                    && num.chars().all(|c| c.is_ascii_digit())
                    && den.chars().all(|c| c.is_ascii_digit())
            }
            None => false,
        }
    })
}
