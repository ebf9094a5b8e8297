use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Fixed weekdays of a plan, monday first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];
}

impl std::fmt::Display for Day {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Day::Monday => "monday",
            Day::Tuesday => "tuesday",
            Day::Wednesday => "wednesday",
            Day::Thursday => "thursday",
            Day::Friday => "friday",
            Day::Saturday => "saturday",
            Day::Sunday => "sunday",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Day {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monday" => Ok(Day::Monday),
            "tuesday" => Ok(Day::Tuesday),
            "wednesday" => Ok(Day::Wednesday),
            "thursday" => Ok(Day::Thursday),
            "friday" => Ok(Day::Friday),
            "saturday" => Ok(Day::Saturday),
            "sunday" => Ok(Day::Sunday),
            _ => Err(anyhow::anyhow!("Unknown day: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Lunch,
    Dinner,
}

impl MealSlot {
    pub const ALL: [MealSlot; 2] = [MealSlot::Lunch, MealSlot::Dinner];
}

impl std::fmt::Display for MealSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MealSlot::Lunch => "lunch",
            MealSlot::Dinner => "dinner",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MealSlot {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lunch" => Ok(MealSlot::Lunch),
            "dinner" => Ok(MealSlot::Dinner),
            _ => Err(anyhow::anyhow!("Unknown meal type: {s}")),
        }
    }
}

/// One generated meal. Names are capped at 50 chars, descriptions at 200;
/// both bounds are enforced when validating generator output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Meal {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Meal {
    pub const MAX_NAME_LEN: usize = 50;
    pub const MAX_DESCRIPTION_LEN: usize = 200;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DayMeals {
    pub lunch: Meal,
    pub dinner: Meal,
}

/// A full week of meals. Deserializing enforces that every day is present;
/// a missing day is a schema error, not an empty entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WeeklyPlan {
    pub monday: DayMeals,
    pub tuesday: DayMeals,
    pub wednesday: DayMeals,
    pub thursday: DayMeals,
    pub friday: DayMeals,
    pub saturday: DayMeals,
    pub sunday: DayMeals,
}

impl WeeklyPlan {
    /// Fallback plan: every meal name empty. Used when generation fails so
    /// plan creation never hard-fails.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn day(&self, day: Day) -> &DayMeals {
        match day {
            Day::Monday => &self.monday,
            Day::Tuesday => &self.tuesday,
            Day::Wednesday => &self.wednesday,
            Day::Thursday => &self.thursday,
            Day::Friday => &self.friday,
            Day::Saturday => &self.saturday,
            Day::Sunday => &self.sunday,
        }
    }

    pub fn meal(&self, day: Day, slot: MealSlot) -> &Meal {
        let meals = self.day(day);
        match slot {
            MealSlot::Lunch => &meals.lunch,
            MealSlot::Dinner => &meals.dinner,
        }
    }

    /// All 14 slots in fixed order (monday lunch, monday dinner, ...).
    pub fn slots(&self) -> impl Iterator<Item = (Day, MealSlot, &Meal)> + '_ {
        Day::ALL.iter().flat_map(move |&day| {
            MealSlot::ALL
                .iter()
                .map(move |&slot| (day, slot, self.meal(day, slot)))
        })
    }
}

/// Read-only prompt context: one previously planned meal.
#[derive(Debug, Clone, FromRow)]
pub struct PastMealRecord {
    pub name: String,
    pub day: String,
    pub meal_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MealPlan {
    pub id: Uuid,
    pub account_id: Uuid,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One stored meal slot. Day and meal_type are kept as TEXT in rows; the
/// CHECK constraints in the schema guarantee their values.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MealRow {
    pub id: Uuid,
    pub meal_plan_id: Uuid,
    pub day: String,
    pub meal_type: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MealPlanWithMeals {
    pub id: Uuid,
    pub account_id: Uuid,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub meals: Vec<MealRow>,
}

impl MealPlanWithMeals {
    pub fn new(plan: MealPlan, meals: Vec<MealRow>) -> Self {
        Self {
            id: plan.id,
            account_id: plan.account_id,
            created_by_id: plan.created_by_id,
            created_at: plan.created_at,
            updated_at: plan.updated_at,
            meals,
        }
    }
}

/// Body for PATCH /meal-plans/{id} (upsert one meal slot).
#[derive(Debug, Deserialize)]
pub struct UpdateMealRequest {
    pub day: Day,
    pub meal_type: MealSlot,
    pub name: String,
}

/// Query params for GET /meal-plans.
#[derive(Debug, Deserialize)]
pub struct PlanListQuery {
    pub cursor: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PlanPage {
    pub items: Vec<MealPlanWithMeals>,
    pub next_cursor: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_plan_has_fourteen_unnamed_slots() {
        let plan = WeeklyPlan::empty();
        let slots: Vec<_> = plan.slots().collect();
        assert_eq!(slots.len(), 14);
        assert!(slots.iter().all(|(_, _, meal)| meal.name.is_empty()));
    }

    #[test]
    fn plan_serializes_with_all_day_keys() {
        let value = serde_json::to_value(WeeklyPlan::empty()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 7);
        for day in Day::ALL {
            let entry = obj.get(&day.to_string()).unwrap();
            assert!(entry.get("lunch").is_some());
            assert!(entry.get("dinner").is_some());
        }
    }

    #[test]
    fn plan_with_missing_day_fails_to_parse() {
        let json = r#"{
            "monday": {"lunch": {"name": "a"}, "dinner": {"name": "b"}},
            "tuesday": {"lunch": {"name": "a"}, "dinner": {"name": "b"}},
            "wednesday": {"lunch": {"name": "a"}, "dinner": {"name": "b"}},
            "thursday": {"lunch": {"name": "a"}, "dinner": {"name": "b"}},
            "friday": {"lunch": {"name": "a"}, "dinner": {"name": "b"}},
            "saturday": {"lunch": {"name": "a"}, "dinner": {"name": "b"}}
        }"#;
        assert!(serde_json::from_str::<WeeklyPlan>(json).is_err());
    }
}
