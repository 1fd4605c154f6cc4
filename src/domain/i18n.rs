use std::collections::BTreeMap;

use crate::settings::Language;

// key, en, en-sw, sw
const STRINGS: &[(&str, &str, &str, &str)] = &[
  ("nav.dashboard", "Dashboard", "Dashboard", "Dashibodi"),
  ("nav.log", "Log Tasks", "Log Tasks", "Rekodi Kazi"),
  ("nav.history", "History", "History", "Historia"),
  ("nav.logout", "Logout", "Logout", "Toka"),
  ("category.kuoga", "Bathing", "Kuoga (Bathing)", "Kuoga"),
  ("category.kufua", "Laundry", "Kufua (Laundry)", "Kufua"),
  ("category.kusafisha", "Cleaning", "Kusafisha (Cleaning)", "Kusafisha"),
  ("category.kupika", "Cooking", "Kupika (Cooking)", "Kupika"),
  ("common.points", "Points", "Pointi", "Pointi"),
  ("common.today", "Today", "Leo", "Leo"),
  ("common.total", "Total", "Jumla", "Jumla"),
  ("common.simple", "Simple Mode", "Rahisi Mode", "Rahisi"),
  ("common.advanced", "Advanced Mode", "Advanced Mode", "Ya Kina"),
  ("common.save", "Save", "Hifadhi", "Hifadhi"),
  ("common.cancel", "Cancel", "Ghairi", "Ghairi"),
  ("common.select_date", "Select Date", "Chagua Tarehe", "Chagua Tarehe"),
  ("task.completed", "Task completed!", "Kazi imekamilika!", "Kazi imekamilika!"),
  ("task.uncompleted", "Task uncompleted", "Kazi haijafanywa", "Kazi haijafanywa"),
];

fn pick(language: Language, entry: &(&'static str, &'static str, &'static str, &'static str)) -> &'static str {
  match language {
    Language::En => entry.1,
    Language::EnSw => entry.2,
    Language::Sw => entry.3,
  }
}

/// Unknown keys come back unchanged.
pub fn translate<'a>(language: Language, key: &'a str) -> &'a str {
  STRINGS
    .iter()
    .find(|entry| entry.0 == key)
    .map(|entry| pick(language, entry))
    .unwrap_or(key)
}

pub fn table(language: Language) -> BTreeMap<&'static str, &'static str> {
  STRINGS.iter().map(|entry| (entry.0, pick(language, entry))).collect()
}
