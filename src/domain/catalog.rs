use serde::Serialize;

use crate::models::FinanceType;
use crate::settings::Language;

#[derive(Debug, Serialize)]
pub struct SubtaskDef {
  pub id: &'static str,
  pub name_en: &'static str,
  pub name_sw: &'static str,
  pub points: u32,
}

#[derive(Debug, Serialize)]
pub struct TaskDef {
  pub id: &'static str,
  pub name_en: &'static str,
  pub name_sw: &'static str,
  pub points: u32,
  pub subtasks: &'static [SubtaskDef],
}

impl TaskDef {
  pub fn subtask(&self, id: &str) -> Option<&'static SubtaskDef> {
    self.subtasks.iter().find(|subtask| subtask.id == id)
  }
}

macro_rules! subtask {
  ($id:expr, $en:expr, $sw:expr, $points:expr) => {
    SubtaskDef {
      id: $id,
      name_en: $en,
      name_sw: $sw,
      points: $points,
    }
  };
}

pub static TASKS: &[TaskDef] = &[
  TaskDef {
    id: "kuoga",
    name_en: "Bathing",
    name_sw: "Kuoga",
    points: 30,
    subtasks: &[
      subtask!("prep", "Undressing & bed prep", "Kuvua nguo na kutengeneza kitanda", 5),
      subtask!("bathing", "Bathing thoroughly", "Kuoga vizuri", 10),
      subtask!("cleaning", "Cleaning bathing area", "Kusafisha mahali pa kuogelea", 5),
      subtask!("grooming", "Lotion, hair, nails, deodorant", "Lotion, nywele, kucha, mafuta ya harufu", 5),
      subtask!("teeth", "Brushing teeth properly", "Kusafisha meno vizuri", 5),
    ],
  },
  TaskDef {
    id: "kufua",
    name_en: "Laundry",
    name_sw: "Kufua",
    points: 20,
    subtasks: &[
      subtask!("underwear", "Underwear", "Nguo za ndani", 5),
      subtask!("socks", "Socks", "Soksi", 4),
      subtask!("tops", "T-shirts / Tops", "Mashati / Blauzi", 4),
      subtask!("bottoms", "Trousers / Skirts", "Suruali / Sketi", 3),
      subtask!("outerwear", "Jackets, sweaters", "Jaketi, sweta", 2),
      subtask!("linens", "Bed linens / pillowcases", "Mashuka / Foronya", 2),
    ],
  },
  TaskDef {
    id: "kusafisha",
    name_en: "Cleaning",
    name_sw: "Kusafisha",
    points: 25,
    subtasks: &[
      subtask!("sweeping", "Sweeping floors", "Kufagia sakafu", 5),
      subtask!("mopping", "Mopping floors", "Kupangusa sakafu", 5),
      subtask!("countertops", "Cleaning countertops/sinks", "Kusafisha countertops/sinki", 5),
      subtask!("dusting", "Dusting furniture/shelves", "Kufuta vumbi vifaa/rafu", 3),
      subtask!("windows", "Cleaning windows/mirrors", "Kusafisha madirisha/vioo", 2),
      subtask!("organizing", "Organizing clutter", "Kupanga vitu", 3),
      subtask!("trash", "Taking out trash", "Kutoa takataka", 2),
    ],
  },
  TaskDef {
    id: "kupika",
    name_en: "Cooking",
    name_sw: "Kupika",
    points: 25,
    subtasks: &[
      subtask!("planning", "Planning the meal", "Kupanga chakula", 3),
      subtask!("cooking", "Cooking main dish", "Kupika chakula kikuu", 7),
      subtask!("sink", "Sink / Countertop cleaning", "Kusafisha sinki / countertop", 5),
      subtask!("plates", "Washing plates/cups", "Kuosha sahani/vikombe", 3),
      subtask!("sufuria", "Washing sufuria (cooking pot)", "Kuosha sufuria", 7),
    ],
  },
];

const INCOME_CATEGORIES: &[&str] = &["Salary", "Business", "Freelance", "Gift", "Other"];
const EXPENSE_CATEGORIES: &[&str] = &[
  "Food",
  "Transport",
  "Rent",
  "Utilities",
  "Shopping",
  "Entertainment",
  "Health",
  "Education",
  "Other",
];
const SAVINGS_CATEGORIES: &[&str] = &["Emergency Fund", "Investment", "Goal", "General"];

pub fn find_task(id: &str) -> Option<&'static TaskDef> {
  TASKS.iter().find(|task| task.id == id)
}

pub fn max_daily_points() -> u32 {
  TASKS.iter().map(|task| task.points).sum()
}

pub fn finance_categories(kind: FinanceType) -> &'static [&'static str] {
  match kind {
    FinanceType::Income => INCOME_CATEGORIES,
    FinanceType::Expense => EXPENSE_CATEGORIES,
    FinanceType::Savings => SAVINGS_CATEGORIES,
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedSubtask {
  pub id: &'static str,
  pub name: String,
  pub points: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedTask {
  pub id: &'static str,
  pub name: String,
  pub points: u32,
  pub subtasks: Vec<LocalizedSubtask>,
}

pub fn localized_tasks(language: Language) -> Vec<LocalizedTask> {
  TASKS
    .iter()
    .map(|task| LocalizedTask {
      id: task.id,
      name: language.display_name(task.name_en, task.name_sw),
      points: task.points,
      subtasks: task
        .subtasks
        .iter()
        .map(|subtask| LocalizedSubtask {
          id: subtask.id,
          name: language.display_name(subtask.name_en, subtask.name_sw),
          points: subtask.points,
        })
        .collect(),
    })
    .collect()
}
