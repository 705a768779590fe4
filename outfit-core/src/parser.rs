//! Best-effort extraction of `Label: value` lines from the model's reply.
//!
//! The reply is untrusted free text: unknown labels are ignored, missing
//! labels are simply absent, and only the first line per label counts.
//! List markers in front of a label are tolerated.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Category, Outfit};

static LABEL_PATTERNS: LazyLock<Vec<(Category, Regex)>> = LazyLock::new(|| {
    Category::all()
        .iter()
        .map(|category| {
            // Anything but letters may precede the label: indentation, bullets, list numbers, bold markers.
            let pattern = format!(
                r"(?im)^[^\p{{L}}\n]*{}[*_]*:[*_]*[ \t]*(\S.*?)[ \t]*\r?$",
                category.label()
            );
            let re = Regex::new(&pattern).expect("category label patterns are valid");
            (*category, re)
        })
        .collect()
});

pub fn parse_outfit(reply: &str) -> Outfit {
    let mut outfit = Outfit::default();

    for (category, re) in LABEL_PATTERNS.iter() {
        if let Some(value) = re.captures(reply).and_then(|c| c.get(1)) {
            outfit.insert(*category, value.as_str().trim());
        }
    }

    outfit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labelled_lines() {
        let outfit = parse_outfit("Top: Chambray\nBottom: Olive Fatigues\nShoes: Paraboot Michael");

        assert_eq!(outfit.get(Category::Top), Some("Chambray"));
        assert_eq!(outfit.get(Category::Bottom), Some("Olive Fatigues"));
        assert_eq!(outfit.get(Category::Shoes), Some("Paraboot Michael"));
        assert!(!outfit.contains(Category::Outer));
        assert!(!outfit.contains(Category::Accessory));
        assert_eq!(outfit.len(), 3);
        assert!(outfit.has_required_fields());
    }

    #[test]
    fn labels_are_case_insensitive() {
        assert_eq!(parse_outfit("top: X"), parse_outfit("Top: X"));
        assert_eq!(parse_outfit("TOP: X").get(Category::Top), Some("X"));
    }

    #[test]
    fn first_occurrence_wins() {
        let outfit = parse_outfit("Top: First\nTop: Second");
        assert_eq!(outfit.get(Category::Top), Some("First"));
    }

    #[test]
    fn composite_tops_are_kept_verbatim() {
        let outfit = parse_outfit("Top: Whitesville Tee + Chambray (unbuttoned)\n");
        assert_eq!(
            outfit.get(Category::Top),
            Some("Whitesville Tee + Chambray (unbuttoned)")
        );
    }

    #[test]
    fn full_message_with_prose() {
        let reply = "Good morning Peter, it is Wednesday 21 Jan in Sydney.\n\
                     The weather today is 18°C, 70% humidity, Overcast.\n\
                     \n\
                     Cool and grey: layer up. Roll the sleeves once.\n\
                     \n\
                     Top: Kamakura OCBD\r\n\
                     Bottom: OrSlow 105 Jeans\r\n\
                     Shoes: Alden Indy Boots\r\n\
                     Outer: Buzz Rickson's Deck Jacket\r\n\
                     Accessory: Tochigi Leather Belt";

        let outfit = parse_outfit(reply);
        assert_eq!(outfit.get(Category::Top), Some("Kamakura OCBD"));
        assert_eq!(outfit.get(Category::Bottom), Some("OrSlow 105 Jeans"));
        assert_eq!(outfit.get(Category::Shoes), Some("Alden Indy Boots"));
        assert_eq!(outfit.get(Category::Outer), Some("Buzz Rickson's Deck Jacket"));
        assert_eq!(outfit.get(Category::Accessory), Some("Tochigi Leather Belt"));
    }

    #[test]
    fn unknown_labels_and_empty_values_are_ignored() {
        let outfit = parse_outfit("Hat: Cap\nTop:\nBottom: Chinos\nLaptop: ThinkPad");
        assert!(!outfit.contains(Category::Top));
        assert_eq!(outfit.get(Category::Bottom), Some("Chinos"));
        assert_eq!(outfit.len(), 1);
        assert!(!outfit.has_required_fields());
    }

    #[test]
    fn bulleted_labels_are_found() {
        let outfit = parse_outfit(
            "Good morning Peter.\n\n- Top: Chambray\n- Bottom: Olive Fatigues\n- Shoes: Paraboot Michael",
        );
        assert_eq!(outfit.get(Category::Top), Some("Chambray"));
        assert_eq!(outfit.get(Category::Bottom), Some("Olive Fatigues"));
        assert_eq!(outfit.get(Category::Shoes), Some("Paraboot Michael"));

        let outfit = parse_outfit("\u{2022} Top: OCBD\n  * Outer: Deck Jacket");
        assert_eq!(outfit.get(Category::Top), Some("OCBD"));
        assert_eq!(outfit.get(Category::Outer), Some("Deck Jacket"));
    }

    #[test]
    fn numbered_and_bold_labels_are_found() {
        let outfit = parse_outfit("1. Top: Whitesville Tee\n2) Bottom: Selvedge Denim\n3. **Shoes**: Chuck 70");
        assert_eq!(outfit.get(Category::Top), Some("Whitesville Tee"));
        assert_eq!(outfit.get(Category::Bottom), Some("Selvedge Denim"));
        assert_eq!(outfit.get(Category::Shoes), Some("Chuck 70"));

        let outfit = parse_outfit("**Top:** Kamakura OCBD");
        assert_eq!(outfit.get(Category::Top), Some("Kamakura OCBD"));
    }

    #[test]
    fn label_inside_a_word_is_not_a_label() {
        let outfit = parse_outfit("- Laptop: ThinkPad\nRooftop: bar\nTop: Chambray");
        assert_eq!(outfit.get(Category::Top), Some("Chambray"));
    }

    #[test]
    fn no_labels_yields_empty_outfit() {
        assert!(parse_outfit("Wear whatever you like today.").is_empty());
    }
}
