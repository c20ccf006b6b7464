//! Built-in sample records served when nothing else is available.

use serde_json::json;

use crate::Record;

/// Sample conference parties.
pub fn sample_parties() -> Vec<Record> {
  vec![
    json!({
      "id": "sample-opening-night",
      "title": "Opening Night Mixer",
      "venue": "Rheinterrasse",
      "date": "2025-08-20",
      "start": "19:00",
      "end": "23:00",
      "price": "Free",
      "tags": ["networking", "open bar"],
      "sample": true
    }),
    json!({
      "id": "sample-indie-meetup",
      "title": "Indie Developer Meetup",
      "venue": "Stadtgarten",
      "date": "2025-08-21",
      "start": "18:30",
      "end": "22:00",
      "price": "Free",
      "tags": ["indie", "meetup"],
      "sample": true
    }),
    json!({
      "id": "sample-closing-party",
      "title": "Closing Party",
      "venue": "Bootshaus",
      "date": "2025-08-23",
      "start": "21:00",
      "end": "03:00",
      "price": "RSVP",
      "tags": ["party"],
      "sample": true
    }),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sample_parties_have_ids() {
    let parties = sample_parties();
    assert!(!parties.is_empty());
    assert!(parties.iter().all(|p| p["id"].is_string()));
  }
}
