use anyhow::Context;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use uuid::Uuid;

use crate::config::Config;
use crate::models::grocery::GroceryList;
use crate::models::plan::{Day, MealRow, MealSlot};

pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailService {
    /// Returns None if SMTP is not fully configured.
    pub fn new(config: &Config) -> Option<Self> {
        let host = config.smtp_host.as_deref()?;
        let username = config.smtp_username.clone()?;
        let password = config.smtp_password.clone()?;
        let from_addr = config.smtp_from.as_deref()?;

        let port = config.smtp_port.unwrap_or(587);
        let creds = Credentials::new(username, password);

        let transport = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .ok()?
                .credentials(creds)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .ok()?
                .credentials(creds)
                .build()
        };

        let from: Mailbox = from_addr.parse().ok()?;

        Some(Self { transport, from })
    }

    fn new_message_id(&self) -> String {
        format!("<{}@{}>", Uuid::new_v4(), self.from.email.domain())
    }

    /// Wraps inner HTML content in the shared MealMind email layout.
    fn wrap_html(content: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width,initial-scale=1">
  <title>MealMind</title>
</head>
<body style="margin:0;padding:0;background-color:#f1f5f9;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,Helvetica,Arial,sans-serif">
  <table role="presentation" width="100%" cellpadding="0" cellspacing="0" style="background-color:#f1f5f9;padding:40px 16px">
    <tr>
      <td align="center">
        <table role="presentation" width="100%" cellpadding="0" cellspacing="0" style="max-width:600px">
          <tr>
            <td align="center" style="padding-bottom:28px">
              <p style="margin:0;font-size:20px;font-weight:700;color:#0f172a;text-align:center">MealMind</p>
            </td>
          </tr>
          <tr>
            <td style="background:#ffffff;border-radius:12px;padding:40px;box-shadow:0 1px 3px rgba(0,0,0,0.08),0 8px 24px rgba(0,0,0,0.04)">
              {content}
            </td>
          </tr>
          <tr>
            <td align="center" style="padding-top:20px">
              <p style="margin:0;font-size:12px;color:#94a3b8">MealMind</p>
            </td>
          </tr>
        </table>
      </td>
    </tr>
  </table>
</body>
</html>"#
        )
    }

    async fn send_email(
        &self,
        to: Mailbox,
        subject: &str,
        text: &str,
        html: &str,
    ) -> anyhow::Result<()> {
        let email = Message::builder()
            .message_id(Some(self.new_message_id()))
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html.to_string()),
                    ),
            )
            .context("Failed to build email message")?;

        self.transport
            .send(email)
            .await
            .context("Failed to send email")?;

        Ok(())
    }

    /// Send the weekly plan summary (meals by day plus the grocery list).
    pub async fn send_meal_plan(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        meals: &[MealRow],
        grocery_list: &GroceryList,
    ) -> anyhow::Result<()> {
        let to: Mailbox = match to_name {
            Some(name) => format!("{name} <{to_email}>")
                .parse()
                .or_else(|_| to_email.parse())?,
            None => to_email.parse()?,
        };

        let subject = "Your Weekly Meal Plan";
        let text = plan_email_text(meals, grocery_list);
        let html = Self::wrap_html(&plan_email_content(meals, grocery_list));

        self.send_email(to, subject, &text, &html).await
    }
}

fn meal_name<'a>(meals: &'a [MealRow], day: Day, slot: MealSlot) -> &'a str {
    meals
        .iter()
        .find(|m| m.day == day.to_string() && m.meal_type == slot.to_string())
        .map(|m| m.name.as_str())
        .unwrap_or("")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn plan_email_text(meals: &[MealRow], grocery_list: &GroceryList) -> String {
    let mut out = String::from("Your Weekly Meal Plan\n");
    for day in Day::ALL {
        out.push_str(&format!(
            "\n{}\n  Lunch: {}\n  Dinner: {}\n",
            capitalize(&day.to_string()),
            meal_name(meals, day, MealSlot::Lunch),
            meal_name(meals, day, MealSlot::Dinner),
        ));
    }

    out.push_str("\nGrocery List\n");
    for (category, items) in &grocery_list.categories {
        out.push_str(&format!("\n{category}\n"));
        for item in items {
            out.push_str(&format!("  - {}", item.item));
            if let Some(quantity) = &item.quantity {
                out.push_str(&format!(" - {quantity}"));
            }
            if let Some(note) = &item.note {
                out.push_str(&format!(" ({note})"));
            }
            out.push('\n');
        }
    }
    out
}

fn plan_email_content(meals: &[MealRow], grocery_list: &GroceryList) -> String {
    let mut content = String::from(
        r#"<h1 style="margin:0 0 24px 0;font-size:22px;font-weight:700;color:#1e293b">Your Weekly Meal Plan</h1>"#,
    );

    for day in Day::ALL {
        content.push_str(&format!(
            r#"<div style="margin-bottom:20px">
  <h2 style="margin:0 0 12px 0;font-size:17px;font-weight:700;color:#334155">{day}</h2>
  <div style="margin-left:16px">
    <p style="margin:8px 0;font-size:14px;color:#334155"><strong>Lunch:</strong> {lunch}</p>
    <p style="margin:8px 0;font-size:14px;color:#334155"><strong>Dinner:</strong> {dinner}</p>
  </div>
</div>"#,
            day = capitalize(&day.to_string()),
            lunch = meal_name(meals, day, MealSlot::Lunch),
            dinner = meal_name(meals, day, MealSlot::Dinner),
        ));
    }

    content.push_str(
        r#"<h2 style="margin:24px 0 0 0;font-size:18px;font-weight:700;color:#334155">Grocery List</h2>"#,
    );
    for (category, items) in &grocery_list.categories {
        content.push_str(&format!(
            r#"<h3 style="margin:16px 0 0 0;font-size:15px;font-weight:600;color:#475569">{category}</h3>
<ul style="margin:0;padding-left:20px">"#
        ));
        for item in items {
            let quantity = item
                .quantity
                .as_deref()
                .map(|q| format!(" - {q}"))
                .unwrap_or_default();
            let note = item
                .note
                .as_deref()
                .map(|n| format!(" ({n})"))
                .unwrap_or_default();
            content.push_str(&format!(
                r#"<li style="margin:4px 0;font-size:14px;color:#334155">{}{quantity}{note}</li>"#,
                item.item
            ));
        }
        content.push_str("</ul>");
    }

    content
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::grocery::GroceryItem;

    fn meal_row(day: &str, meal_type: &str, name: &str) -> MealRow {
        MealRow {
            id: Uuid::new_v4(),
            meal_plan_id: Uuid::new_v4(),
            day: day.to_string(),
            meal_type: meal_type.to_string(),
            name: name.to_string(),
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_list() -> GroceryList {
        let mut list = GroceryList {
            categories: Default::default(),
        };
        list.categories.insert(
            "Verdura (Vegetables)".to_string(),
            vec![GroceryItem {
                item: "Spinaci (Spinach)".to_string(),
                quantity: Some("500g".to_string()),
                note: Some("fresh".to_string()),
            }],
        );
        list
    }

    #[test]
    fn email_content_lists_every_day_and_grocery_items() {
        let meals = vec![
            meal_row("monday", "lunch", "Pasta e ceci"),
            meal_row("monday", "dinner", "Orata al forno"),
        ];
        let content = plan_email_content(&meals, &sample_list());

        for day in Day::ALL {
            assert!(content.contains(&capitalize(&day.to_string())));
        }
        assert!(content.contains("Pasta e ceci"));
        assert!(content.contains("Orata al forno"));
        assert!(content.contains("Spinaci (Spinach) - 500g (fresh)"));
    }

    #[test]
    fn email_text_renders_quantities_and_notes() {
        let meals = vec![meal_row("friday", "dinner", "Frittata con zucchine")];
        let text = plan_email_text(&meals, &sample_list());

        assert!(text.contains("Friday"));
        assert!(text.contains("Dinner: Frittata con zucchine"));
        assert!(text.contains("- Spinaci (Spinach) - 500g (fresh)"));
    }
}
