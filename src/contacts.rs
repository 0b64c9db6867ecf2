use crate::api::models::{DeviceContact, MatchedContact, User};
use crate::phone::{Identity, normalize_phone};
use std::collections::{HashMap, HashSet};

fn is_ten_digit_id(id: &str) -> bool {
    id.len() == 10 && id.bytes().all(|b| b.is_ascii_digit())
}

/// Device contacts that belong to registered users, sorted by name.
///
/// A user is registered under its normalized `phone` field, and under its document id
/// when that id is itself a ten-digit number. Each number is reported once; the first
/// contact carrying it wins.
pub fn match_contacts(local: &[DeviceContact], users: &[User]) -> Vec<MatchedContact> {
    let mut avatars: HashMap<String, Option<String>> = HashMap::new();
    for user in users {
        let mut keys = Vec::with_capacity(2);
        if is_ten_digit_id(&user.uid) {
            keys.push(user.uid.clone());
        }
        if let Some(phone) = user.phone.as_deref() {
            keys.push(normalize_phone(phone));
        }
        for key in keys.into_iter().filter(|k| !k.is_empty()) {
            let slot = avatars.entry(key).or_insert(None);
            if slot.is_none() {
                *slot = user.profile_pic.clone();
            }
        }
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for contact in local {
        for number in &contact.phone_numbers {
            let Some(identity) = Identity::parse(number) else {
                log::debug!("skipping unusable number on contact {}", contact.id);
                continue;
            };
            let Some(avatar_url) = avatars.get(identity.as_str()) else { continue };
            if !seen.insert(identity.clone()) {
                continue;
            }
            let name = if contact.name.trim().is_empty() { "Unknown".to_string() } else { contact.name.clone() };
            out.push(MatchedContact {
                contact_id: contact.id.clone(),
                name,
                identity,
                avatar_url: avatar_url.clone(),
            });
        }
    }
    out.sort_by_key(|c| c.name.to_lowercase());
    out
}
