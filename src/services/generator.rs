use chrono::{Datelike, Utc};
use serde_json::{json, Value};
use thiserror::Error;

use crate::models::grocery::GroceryList;
use crate::models::plan::{Day, Meal, PastMealRecord, WeeklyPlan};
use crate::models::user::Language;
use crate::services::completion::{
    ChatMessage, CompletionApi, CompletionError, CompletionRequest, ResponseFormat,
};

/// How many past meals are embedded in the plan prompt.
const RECENT_MEALS_LIMIT: usize = 10;

const PLAN_TEMPERATURE: f32 = 0.7;
const GROCERY_TEMPERATURE: f32 = 0.7;
const PLAN_MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("completion service unavailable: {0}")]
    ServiceUnavailable(#[from] CompletionError),
    #[error("invalid completion response: {0}")]
    InvalidResponseFormat(String),
}

// ─── Seasons ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    /// Four fixed bands over the calendar month (1-12).
    pub fn from_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Autumn,
        }
    }

    pub fn current() -> Self {
        Self::from_month(Utc::now().month())
    }

    pub fn vegetables(self) -> &'static [&'static str] {
        match self {
            Season::Winter => &[
                "cavolo nero (black kale)",
                "broccoli",
                "cavolfiori (cauliflower)",
                "verza (savoy cabbage)",
                "cime di rapa (turnip tops)",
                "spinaci (spinach)",
                "bietole (chard)",
                "carote (carrots)",
                "finocchi (fennel)",
                "zucca (pumpkin)",
                "porri (leeks)",
                "radicchio",
                "pomodori (tomatoes)",
                "peperoni (bell peppers)",
                "zucchine (zucchini)",
                "cetrioli (cucumbers)",
            ],
            Season::Spring => &[
                "asparagi (asparagus)",
                "carciofi (artichokes)",
                "fave (broad beans)",
                "spinaci (spinach)",
                "agretti",
                "ravanelli (radishes)",
                "rucola (rocket)",
                "lattuga (lettuce)",
                "pomodori (tomatoes)",
                "peperoni (bell peppers)",
                "zucchine (zucchini)",
                "cetrioli (cucumbers)",
            ],
            Season::Summer => &[
                "pomodori (tomatoes)",
                "peperoni (bell peppers)",
                "zucchine (zucchini)",
                "cetrioli (cucumbers)",
                "insalate (lettuce varieties)",
                "melanzane (eggplants)",
                "fagiolini (green beans)",
                "basilico (basil)",
            ],
            Season::Autumn => &[
                "zucca (pumpkin)",
                "carciofi (artichokes)",
                "broccoli",
                "cavolfiori (cauliflower)",
                "verza (savoy cabbage)",
                "radicchio",
                "finocchi (fennel)",
            ],
        }
    }
}

// ─── Prompt templates ────────────────────────────────────────────────────────

/// Per-language plan prompt text. `{vegetables}`, `{seasonal_guidance}` and
/// `{recent_meals}` are substituted at assembly time.
struct PlanPromptTemplate {
    system: &'static str,
    user: &'static str,
    winter_guidance: &'static str,
    recent_meals_header: &'static str,
}

static PLAN_TEMPLATE_EN: PlanPromptTemplate = PlanPromptTemplate {
    system: r#"You are an Italian meal planner. Create a weekly meal plan following these strict rules and return it as a JSON object:

DIETARY RULES:
1. NO MUSHROOMS ALLOWED in any meal
2. Each meal MUST include EXACTLY:
   - ONE protein source (no multiple proteins in the same meal)
   - ONE carbohydrate source (pasta, basmati rice, bread, potatoes, couscous, emmer, venus rice, etc.)
   - Vegetables (use only seasonal vegetables: {vegetables})

PROTEIN RULES:
- Available proteins (CHOOSE ONLY ONE PER MEAL):
  * Legumes (chickpeas, lentils, beans)
  * Meat (red/white)
  * Fresh cheese (mozzarella, robiola, ricotta) - NO aged cheeses as main protein
  * Fish (prefer simple preparations)
  * Eggs (max 1 meal per week)
- Maximum 1 red meat meal per week
- Maximum 2 white meat meals per week
- Balance protein sources across the week
- Default to legumes when in doubt
- Never repeat the same protein source in consecutive meals

MEAL STRUCTURE:
- Keep meals SIMPLE and QUICK to prepare (max 30 minutes cooking time)
- Use ONLY Italian-style combinations
- Prefer light lunches and normal portions for dinner
- NO complex preparations
- Try to avoid exact repetition of recent meals
- It's OK to use variations of past successful meals

{seasonal_guidance}

IMPORTANT: Every meal MUST have a non-empty name property.

EXAMPLES OF GOOD MEALS:
- "Pasta ricotta e spinaci" (protein: ricotta)
- "Insalata di lenticchie con pomodorini e pane" (protein: lentils)
- "Petto di pollo ai ferri con zucchine" (protein: chicken)
- "Orata al forno con patate" (protein: fish)

EXAMPLES OF MEALS TO AVOID:
- "Quinoa bowl with multiple proteins" (too many proteins)
- "Stir-fry with rice" (not Italian style)
- "Complex stews or slow-cooked meals" (too long to prepare)
- "Risotto with seafood mix" (too complex/expensive){recent_meals}"#,
    user: "Generate a weekly meal plan with lunch and dinner for each day. Provide the response as a JSON object following the specified schema. Each meal should be simple, Italian-style, and contain exactly one protein source. Consider the recent meals provided and try to introduce some variety.",
    winter_guidance: r#"WINTER MEAL GUIDELINES:
- Prefer warm, comforting dishes over cold ones
- Include more soups and broths
- Use winter vegetables in season: {vegetables}
- Favor heartier cooking methods like roasting and braising
- Include warming spices and herbs (rosemary, sage, bay leaves)

WINTER MEAL EXAMPLES:
- "Zuppa di legumi con cavolo nero e crostini di pane" (legume and black kale soup)
- "Pasta e fagioli" (pasta and beans soup)
- "Minestra di farro, lenticchie con carote, cipolle e sedano" (farro soup with lentils, carrots, onions and celery)
- "Pasta al forno con ricotta e spinaci" (baked pasta with ricotta and spinach)"#,
    recent_meals_header: "RECENT MEALS (for reference):",
};

static PLAN_TEMPLATE_IT: PlanPromptTemplate = PlanPromptTemplate {
    system: r#"Sei un pianificatore di pasti italiano. Crea un piano settimanale dei pasti seguendo queste regole rigorose e restituiscilo come oggetto JSON:

REGOLE ALIMENTARI:
1. NIENTE FUNGHI in nessun pasto
2. Ogni pasto DEVE includere ESATTAMENTE:
   - UNA fonte proteica (niente proteine multiple nello stesso pasto)
   - UNA fonte di carboidrati (pasta, riso basmati, pane, patate, couscous, farro, riso venere, ecc.)
   - Verdure (usa solo verdure di stagione: {vegetables})

REGOLE SULLE PROTEINE:
- Proteine disponibili (SCEGLINE SOLO UNA PER PASTO):
  * Legumi (ceci, lenticchie, fagioli)
  * Carne (rossa/bianca)
  * Formaggi freschi (mozzarella, robiola, ricotta) - NIENTE formaggi stagionati come proteina principale
  * Pesce (preferisci preparazioni semplici)
  * Uova (massimo 1 pasto a settimana)
- Massimo 1 pasto di carne rossa a settimana
- Massimo 2 pasti di carne bianca a settimana
- Bilancia le fonti proteiche durante la settimana
- In caso di dubbio scegli i legumi
- Non ripetere mai la stessa fonte proteica in pasti consecutivi

STRUTTURA DEI PASTI:
- Pasti SEMPLICI e VELOCI da preparare (massimo 30 minuti di cottura)
- Usa SOLO abbinamenti in stile italiano
- Preferisci pranzi leggeri e porzioni normali a cena
- NIENTE preparazioni complesse
- Cerca di evitare la ripetizione esatta dei pasti recenti
- Va bene usare variazioni di pasti passati riusciti

{seasonal_guidance}

IMPORTANTE: Ogni pasto DEVE avere una proprietà name non vuota.

ESEMPI DI PASTI ADATTI:
- "Pasta ricotta e spinaci" (proteina: ricotta)
- "Insalata di lenticchie con pomodorini e pane" (proteina: lenticchie)
- "Petto di pollo ai ferri con zucchine" (proteina: pollo)
- "Orata al forno con patate" (proteina: pesce)

ESEMPI DI PASTI DA EVITARE:
- "Quinoa bowl con più proteine" (troppe proteine)
- "Saltato in padella con riso" (non in stile italiano)
- "Stufati complessi o cotture lente" (troppo lunghi da preparare)
- "Risotto con misto di mare" (troppo complesso/costoso){recent_meals}"#,
    user: "Genera un piano settimanale dei pasti con pranzo e cena per ogni giorno. Fornisci la risposta come oggetto JSON secondo lo schema indicato. Ogni pasto deve essere semplice, in stile italiano, e contenere esattamente una fonte proteica. Considera i pasti recenti forniti e cerca di introdurre un po' di varietà.",
    winter_guidance: r#"LINEE GUIDA INVERNALI:
- Preferisci piatti caldi e confortanti a quelli freddi
- Includi più zuppe e brodi
- Usa le verdure invernali di stagione: {vegetables}
- Privilegia cotture sostanziose come arrosto e brasato
- Includi spezie ed erbe riscaldanti (rosmarino, salvia, alloro)

ESEMPI DI PASTI INVERNALI:
- "Zuppa di legumi con cavolo nero e crostini di pane"
- "Pasta e fagioli"
- "Minestra di farro, lenticchie con carote, cipolle e sedano"
- "Pasta al forno con ricotta e spinaci""#,
    recent_meals_header: "PASTI RECENTI (per riferimento):",
};

fn plan_template(language: Language) -> &'static PlanPromptTemplate {
    match language {
        Language::En => &PLAN_TEMPLATE_EN,
        Language::It => &PLAN_TEMPLATE_IT,
    }
}

const GROCERY_SYSTEM_PROMPT: &str = r#"You are an Italian grocery list generator. Create a categorized grocery list for the provided meals. Return a JSON object with EXACTLY this structure:
{
  "categories": {
    "Verdura (Vegetables)": [
      { "item": "Spinaci (Spinach)", "quantity": "500g" },
      { "item": "Zucchine (Zucchini)", "quantity": "4 pezzi" }
    ],
    "Carne e Pesce (Meat and Fish)": [
      { "item": "Petto di pollo (Chicken breast)", "quantity": "600g" }
    ]
  }
}

Rules:
1. Always include these categories (even if empty):
   - "Verdura (Vegetables)"
   - "Frutta (Fruit)"
   - "Carne e Pesce (Meat and Fish)"
   - "Latticini (Dairy)"
   - "Dispensa (Pantry)"
   - "Erbe e Spezie (Herbs and Spices)"

2. For each item include:
   - Required: "item" with Italian and English names
   - Optional: "quantity" with amount
   - Optional: "note" for freshness/ripeness

3. Combine similar items and adjust quantities
4. Focus on fresh, seasonal ingredients
5. Include basic pantry items only if essential"#;

// ─── Prompt assembly ─────────────────────────────────────────────────────────

fn build_plan_system_prompt(
    language: Language,
    season: Season,
    past_meals: &[PastMealRecord],
) -> String {
    let template = plan_template(language);
    let vegetables = season.vegetables().join(", ");

    let seasonal_guidance = if season == Season::Winter {
        template.winter_guidance.replace("{vegetables}", &vegetables)
    } else {
        String::new()
    };

    let recent_meals = if past_meals.is_empty() {
        String::new()
    } else {
        let mut recent: Vec<&PastMealRecord> = past_meals.iter().collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let lines: Vec<String> = recent
            .iter()
            .take(RECENT_MEALS_LIMIT)
            .map(|meal| format!("- {} ({} {})", meal.name, meal.day, meal.meal_type))
            .collect();
        format!("\n{}\n{}", template.recent_meals_header, lines.join("\n"))
    };

    template
        .system
        .replace("{vegetables}", &vegetables)
        .replace("{seasonal_guidance}", &seasonal_guidance)
        .replace("{recent_meals}", &recent_meals)
}

/// JSON schema the plan completion is constrained to: all seven days, each
/// with lunch and dinner, meal names capped at 50 chars and descriptions at
/// 200.
fn weekly_plan_schema() -> Value {
    let meal = json!({
        "type": "object",
        "properties": {
            "name": {
                "type": "string",
                "maxLength": Meal::MAX_NAME_LEN,
                "description": "The name of the meal, should be concise but descriptive"
            },
            "description": {
                "type": "string",
                "maxLength": Meal::MAX_DESCRIPTION_LEN,
                "description": "A brief description of the meal, including main ingredients and style"
            }
        },
        "required": ["name"],
        "additionalProperties": false
    });

    let day_meals = json!({
        "type": "object",
        "properties": {
            "lunch": meal.clone(),
            "dinner": meal,
        },
        "required": ["lunch", "dinner"],
        "additionalProperties": false
    });

    let mut properties = serde_json::Map::new();
    for day in Day::ALL {
        properties.insert(day.to_string(), day_meals.clone());
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": Day::ALL.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
        "additionalProperties": false
    })
}

// ─── Validation ──────────────────────────────────────────────────────────────

fn validate_weekly_plan(plan: &WeeklyPlan) -> Result<(), GenerationError> {
    for (day, slot, meal) in plan.slots() {
        if meal.name.is_empty() {
            return Err(GenerationError::InvalidResponseFormat(format!(
                "empty meal name for {day} {slot}"
            )));
        }
        if meal.name.chars().count() > Meal::MAX_NAME_LEN {
            return Err(GenerationError::InvalidResponseFormat(format!(
                "meal name for {day} {slot} exceeds {} chars",
                Meal::MAX_NAME_LEN
            )));
        }
        if let Some(description) = &meal.description {
            if description.chars().count() > Meal::MAX_DESCRIPTION_LEN {
                return Err(GenerationError::InvalidResponseFormat(format!(
                    "meal description for {day} {slot} exceeds {} chars",
                    Meal::MAX_DESCRIPTION_LEN
                )));
            }
        }
    }
    Ok(())
}

fn parse_weekly_plan(content: &str) -> Result<WeeklyPlan, GenerationError> {
    let plan: WeeklyPlan = serde_json::from_str(content)
        .map_err(|e| GenerationError::InvalidResponseFormat(e.to_string()))?;
    validate_weekly_plan(&plan)?;
    Ok(plan)
}

fn parse_grocery_list(content: &str) -> Result<GroceryList, GenerationError> {
    let list: GroceryList = serde_json::from_str(content)
        .map_err(|e| GenerationError::InvalidResponseFormat(e.to_string()))?;
    Ok(list.normalize())
}

// ─── Generation ──────────────────────────────────────────────────────────────

/// Generate a full week of meals. The prompt embeds the 10 most recent past
/// meals and the seasonal vegetable list for the current date; the response
/// is schema-constrained and re-validated locally before being trusted.
pub async fn generate_weekly_plan(
    client: &dyn CompletionApi,
    past_meals: &[PastMealRecord],
    language: Language,
) -> Result<WeeklyPlan, GenerationError> {
    let system = build_plan_system_prompt(language, Season::current(), past_meals);
    let request = CompletionRequest {
        messages: vec![
            ChatMessage::system(system),
            ChatMessage::user(plan_template(language).user),
        ],
        response_format: Some(ResponseFormat::json_schema(
            "WeeklyMealPlan",
            weekly_plan_schema(),
        )),
        temperature: PLAN_TEMPERATURE,
        max_retries: PLAN_MAX_RETRIES,
    };

    let content = client.complete(&request).await?;
    parse_weekly_plan(&content)
}

/// Generate a categorized grocery list for the given meal names. The response
/// is requested as free-form JSON and parsed/validated locally; no retry at
/// this layer.
pub async fn generate_grocery_list(
    client: &dyn CompletionApi,
    meal_names: &[String],
) -> Result<GroceryList, GenerationError> {
    let request = CompletionRequest {
        messages: vec![
            ChatMessage::system(GROCERY_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Generate a grocery list for these meals: {}",
                meal_names.join(", ")
            )),
        ],
        response_format: Some(ResponseFormat::json_object()),
        temperature: GROCERY_TEMPERATURE,
        max_retries: 0,
    };

    let content = client.complete(&request).await?;
    parse_grocery_list(&content)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use super::*;
    use crate::models::grocery::GROCERY_CATEGORIES;
    use crate::models::plan::{DayMeals, MealSlot};

    /// Deterministic stand-in for the hosted service: replays a fixed body
    /// and records the last request it saw.
    struct StubClient {
        response: Result<String, ()>,
        last_request: Mutex<Option<CompletionRequest>>,
    }

    impl StubClient {
        fn replying(body: impl Into<String>) -> Self {
            Self {
                response: Ok(body.into()),
                last_request: Mutex::new(None),
            }
        }

        fn failing() -> Self {
            Self {
                response: Err(()),
                last_request: Mutex::new(None),
            }
        }

        fn system_prompt(&self) -> String {
            let guard = self.last_request.lock().unwrap();
            guard.as_ref().unwrap().messages[0].content.clone()
        }

        fn user_prompt(&self) -> String {
            let guard = self.last_request.lock().unwrap();
            guard.as_ref().unwrap().messages[1].content.clone()
        }
    }

    #[async_trait]
    impl CompletionApi for StubClient {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
            *self.last_request.lock().unwrap() = Some(request.clone());
            match &self.response {
                Ok(body) => Ok(body.clone()),
                Err(()) => Err(CompletionError::Api {
                    status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                    body: "upstream down".to_string(),
                }),
            }
        }
    }

    fn sample_plan() -> WeeklyPlan {
        let day = DayMeals {
            lunch: Meal {
                name: "Pasta ricotta e spinaci".to_string(),
                description: Some("Quick pasta with fresh ricotta".to_string()),
            },
            dinner: Meal {
                name: "Orata al forno con patate".to_string(),
                description: None,
            },
        };
        WeeklyPlan {
            monday: day.clone(),
            tuesday: day.clone(),
            wednesday: day.clone(),
            thursday: day.clone(),
            friday: day.clone(),
            saturday: day.clone(),
            sunday: day,
        }
    }

    fn past_meal(name: &str, minutes_ago: i64) -> PastMealRecord {
        PastMealRecord {
            name: name.to_string(),
            day: "monday".to_string(),
            meal_type: "lunch".to_string(),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn valid_plan_response_is_accepted() {
        let body = serde_json::to_string(&sample_plan()).unwrap();
        let stub = StubClient::replying(body);

        let plan = generate_weekly_plan(&stub, &[], Language::En).await.unwrap();
        assert_eq!(plan.meal(Day::Monday, MealSlot::Lunch).name, "Pasta ricotta e spinaci");
        assert_eq!(plan.slots().count(), 14);
    }

    #[tokio::test]
    async fn plan_request_is_schema_constrained() {
        let body = serde_json::to_string(&sample_plan()).unwrap();
        let stub = StubClient::replying(body);
        generate_weekly_plan(&stub, &[], Language::En).await.unwrap();

        let guard = stub.last_request.lock().unwrap();
        let request = guard.as_ref().unwrap();
        assert_eq!(request.temperature, 0.7);
        assert_eq!(request.max_retries, 3);
        let format = request.response_format.as_ref().unwrap();
        assert_eq!(format.format_type, "json_schema");
        let schema = &format.json_schema.as_ref().unwrap().schema;
        assert_eq!(schema["required"].as_array().unwrap().len(), 7);
        assert_eq!(
            schema["properties"]["sunday"]["required"],
            serde_json::json!(["lunch", "dinner"])
        );
    }

    #[tokio::test]
    async fn missing_day_is_a_format_error() {
        let mut value = serde_json::to_value(sample_plan()).unwrap();
        value.as_object_mut().unwrap().remove("sunday");
        let stub = StubClient::replying(value.to_string());

        let err = generate_weekly_plan(&stub, &[], Language::En).await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponseFormat(_)));
    }

    #[tokio::test]
    async fn empty_meal_name_is_a_format_error() {
        let mut plan = sample_plan();
        plan.wednesday.dinner.name = String::new();
        let stub = StubClient::replying(serde_json::to_string(&plan).unwrap());

        let err = generate_weekly_plan(&stub, &[], Language::En).await.unwrap_err();
        match err {
            GenerationError::InvalidResponseFormat(msg) => {
                assert!(msg.contains("wednesday dinner"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn overlong_fields_are_format_errors() {
        let mut plan = sample_plan();
        plan.friday.lunch.name = "x".repeat(51);
        let stub = StubClient::replying(serde_json::to_string(&plan).unwrap());
        let err = generate_weekly_plan(&stub, &[], Language::En).await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponseFormat(_)));

        let mut plan = sample_plan();
        plan.friday.lunch.description = Some("y".repeat(201));
        let stub = StubClient::replying(serde_json::to_string(&plan).unwrap());
        let err = generate_weekly_plan(&stub, &[], Language::En).await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponseFormat(_)));
    }

    #[tokio::test]
    async fn service_failure_surfaces_as_unavailable() {
        let stub = StubClient::failing();
        let err = generate_weekly_plan(&stub, &[], Language::En).await.unwrap_err();
        assert!(matches!(err, GenerationError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn recent_meals_are_embedded_most_recent_first_and_truncated() {
        let mut meals: Vec<PastMealRecord> = (0..12)
            .map(|i| past_meal(&format!("Meal {i}"), i * 60))
            .collect();
        // Shuffle the input order; the prompt must sort by recency itself.
        meals.reverse();

        let body = serde_json::to_string(&sample_plan()).unwrap();
        let stub = StubClient::replying(body);
        generate_weekly_plan(&stub, &meals, Language::En).await.unwrap();

        let system = stub.system_prompt();
        assert!(system.contains("RECENT MEALS"));
        assert!(system.contains("- Meal 0 (monday lunch)"));
        assert!(system.contains("- Meal 9 (monday lunch)"));
        // Only the 10 most recent survive.
        assert!(!system.contains("Meal 10"));
        assert!(!system.contains("Meal 11"));
        let meal0 = system.find("- Meal 0 ").unwrap();
        let meal9 = system.find("- Meal 9 ").unwrap();
        assert!(meal0 < meal9);
    }

    #[tokio::test]
    async fn italian_template_is_selected_for_it() {
        let body = serde_json::to_string(&sample_plan()).unwrap();
        let stub = StubClient::replying(body);
        generate_weekly_plan(&stub, &[past_meal("Pasta e fagioli", 5)], Language::It)
            .await
            .unwrap();

        let system = stub.system_prompt();
        assert!(system.contains("Sei un pianificatore di pasti italiano"));
        assert!(system.contains("PASTI RECENTI"));
        assert!(system.contains("- Pasta e fagioli (monday lunch)"));
        assert!(stub.user_prompt().starts_with("Genera un piano settimanale"));
    }

    #[tokio::test]
    async fn grocery_list_gains_all_fixed_categories() {
        let body = r#"{
            "categories": {
                "Verdura (Vegetables)": [
                    { "item": "Spinaci (Spinach)", "quantity": "500g" }
                ]
            }
        }"#;
        let stub = StubClient::replying(body);

        let list = generate_grocery_list(&stub, &["Pasta ricotta e spinaci".to_string()])
            .await
            .unwrap();
        for category in GROCERY_CATEGORIES {
            assert!(list.categories.contains_key(category), "missing {category}");
        }
        assert_eq!(list.categories["Verdura (Vegetables)"].len(), 1);
        assert!(list.categories["Frutta (Fruit)"].is_empty());
    }

    #[tokio::test]
    async fn grocery_request_joins_meal_names_without_schema_mode() {
        let stub = StubClient::replying(r#"{"categories": {}}"#);
        generate_grocery_list(
            &stub,
            &["Pasta e ceci".to_string(), "Orata al forno".to_string()],
        )
        .await
        .unwrap();

        let guard = stub.last_request.lock().unwrap();
        let request = guard.as_ref().unwrap();
        assert_eq!(request.max_retries, 0);
        assert_eq!(
            request.response_format.as_ref().unwrap().format_type,
            "json_object"
        );
        drop(guard);
        assert!(stub
            .user_prompt()
            .ends_with("Pasta e ceci, Orata al forno"));
    }

    #[tokio::test]
    async fn grocery_generation_is_idempotent_against_a_deterministic_stub() {
        let body = r#"{
            "categories": {
                "Dispensa (Pantry)": [
                    { "item": "Pasta", "quantity": "1kg", "note": "short shapes" }
                ]
            }
        }"#;
        let stub = StubClient::replying(body);
        let meals = vec!["Pasta e ceci".to_string()];

        let first = generate_grocery_list(&stub, &meals).await.unwrap();
        let second = generate_grocery_list(&stub, &meals).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn grocery_non_json_is_a_format_error() {
        let stub = StubClient::replying("Sure! Here's your grocery list:");
        let err = generate_grocery_list(&stub, &["Pasta".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponseFormat(_)));
    }

    #[tokio::test]
    async fn grocery_failure_is_distinguishable_from_an_empty_list() {
        let stub = StubClient::failing();
        let result = generate_grocery_list(&stub, &[]).await;
        assert!(matches!(result, Err(GenerationError::ServiceUnavailable(_))));
    }

    #[test]
    fn seasons_follow_fixed_month_bands() {
        assert_eq!(Season::from_month(12), Season::Winter);
        assert_eq!(Season::from_month(1), Season::Winter);
        assert_eq!(Season::from_month(2), Season::Winter);
        assert_eq!(Season::from_month(3), Season::Spring);
        assert_eq!(Season::from_month(5), Season::Spring);
        assert_eq!(Season::from_month(6), Season::Summer);
        assert_eq!(Season::from_month(8), Season::Summer);
        assert_eq!(Season::from_month(9), Season::Autumn);
        assert_eq!(Season::from_month(11), Season::Autumn);
    }

    #[test]
    fn winter_prompt_includes_guidance_and_vegetables() {
        let system = build_plan_system_prompt(Language::En, Season::Winter, &[]);
        assert!(system.contains("WINTER MEAL GUIDELINES"));
        assert!(system.contains("cavolo nero (black kale)"));

        let summer = build_plan_system_prompt(Language::En, Season::Summer, &[]);
        assert!(!summer.contains("WINTER MEAL GUIDELINES"));
        assert!(summer.contains("melanzane (eggplants)"));
    }
}
