//! Built-in campaign content so the game is playable without a config file or remote backend.

use crate::domain::{AnswerOption, Brand, Question};

pub fn seed_brands() -> Vec<Brand> {
  vec![
    brand(1, "Aspirina", "/images/aspirina.png"),
    brand(2, "Alka-Seltzer", "/images/alka.png"),
    brand(3, "Tabcin", "/images/tabcin.png"),
  ]
}

fn brand(id: u32, name: &str, logo: &str) -> Brand {
  Brand { id, name: name.into(), country_id: 1, logo_url: Some(logo.into()), banner_url: None }
}

/// Five questions for country 1 / brand 1. Option ids are `question_id * 10 + n`.
pub fn seed_questions() -> Vec<Question> {
  vec![
    question(1, "What is the active ingredient of Aspirina?", &["Acetylsalicylic acid", "Paracetamol", "Ibuprofen"]),
    question(2, "What is Aspirina mainly used for?", &["Relieving pain and reducing fever", "Treating bacterial infections", "Improving digestion"]),
    question(3, "In which year was Aspirina invented?", &["1899", "1950", "1920"]),
    question(4, "Which is a common contraindication of Aspirina?", &["Gastric ulcers", "Headache", "High fever"]),
    question(5, "Which company makes Aspirina?", &["Bayer", "Pfizer", "Johnson & Johnson"]),
  ]
}

// First option is the correct one.
fn question(id: u32, text: &str, options: &[&str]) -> Question {
  Question {
    id,
    text: text.into(),
    country_id: 1,
    brand_id: 1,
    options: options
      .iter()
      .enumerate()
      .map(|(i, t)| AnswerOption { id: id * 10 + i as u32 + 1, text: (*t).into(), is_correct: i == 0 })
      .collect(),
  }
}
