//! Manpower record form.

use chrono::NaiveDate;

use crate::fields::{ManpowerType, WorkCategory};
use crate::task::{check_amount, Manpower, ManpowerDraft};
use crate::tui::input::InputField;

pub const DATE_GLOBAL_ORDER: usize = 0;
pub const TYPE_GLOBAL_ORDER: usize = 1;
pub const WORK_GLOBAL_ORDER: usize = 2;
pub const COUNT_GLOBAL_ORDER: usize = 3;
pub const COST_GLOBAL_ORDER: usize = 4;

const FIELD_COUNT: usize = 5;

pub struct ManpowerForm {
    /// `Some(id)` when editing an existing record.
    pub editing: Option<u64>,
    pub date: InputField,
    pub manpower_type: usize,
    pub engaged_to: usize,
    pub count: InputField,
    pub cost: InputField,
    pub current_field: usize,
}

impl ManpowerForm {
    pub fn new() -> Self {
        let mut form = Self {
            editing: None,
            date: InputField::new(),
            manpower_type: 0,
            engaged_to: 0,
            count: InputField::with_value("1"),
            cost: InputField::new(),
            current_field: DATE_GLOBAL_ORDER,
        };
        form.date.active = true;
        form
    }

    pub fn from_record(record: &Manpower) -> Self {
        let mut form = Self::new();
        form.editing = Some(record.id);
        form.date = InputField::with_value(&record.date.format("%Y-%m-%d").to_string());
        form.date.active = true;
        form.manpower_type =
            ManpowerType::ALL.iter().position(|&k| k == record.manpower_type).unwrap_or(0);
        form.engaged_to = WorkCategory::ALL.iter().position(|&w| w == record.engaged_to).unwrap_or(0);
        form.count = InputField::with_value(&record.number_of_manpower.to_string());
        form.cost = InputField::with_value(
            &record.perday_cost.map(|c| c.to_string()).unwrap_or_default(),
        );
        form
    }

    pub fn title(&self) -> String {
        match self.editing {
            Some(id) => format!("Edit Manpower Record {id}"),
            None => "New Manpower Record".to_string(),
        }
    }

    pub fn selected_type(&self) -> ManpowerType {
        ManpowerType::ALL[self.manpower_type % ManpowerType::ALL.len()]
    }

    pub fn selected_work(&self) -> WorkCategory {
        WorkCategory::ALL[self.engaged_to % WorkCategory::ALL.len()]
    }

    fn current_input(&mut self) -> Option<&mut InputField> {
        match self.current_field {
            DATE_GLOBAL_ORDER => Some(&mut self.date),
            COUNT_GLOBAL_ORDER => Some(&mut self.count),
            COST_GLOBAL_ORDER => Some(&mut self.cost),
            _ => None,
        }
    }

    pub fn next_field(&mut self) {
        self.current_field = (self.current_field + 1) % FIELD_COUNT;
        self.update_active_field();
    }

    pub fn prev_field(&mut self) {
        self.current_field = (self.current_field + FIELD_COUNT - 1) % FIELD_COUNT;
        self.update_active_field();
    }

    fn update_active_field(&mut self) {
        self.date.active = false;
        self.count.active = false;
        self.cost.active = false;
        if let Some(field) = self.current_input() {
            field.active = true;
        }
    }

    pub fn handle_char(&mut self, c: char) {
        if let Some(field) = self.current_input() {
            field.handle_char(c);
        }
    }

    pub fn handle_backspace(&mut self) {
        if let Some(field) = self.current_input() {
            field.handle_backspace();
        }
    }

    pub fn handle_delete(&mut self) {
        if let Some(field) = self.current_input() {
            field.handle_delete();
        }
    }

    pub fn handle_left_right(&mut self, right: bool) {
        let cycle = |i: usize, n: usize| if right { (i + 1) % n } else { (i + n - 1) % n };
        match self.current_field {
            TYPE_GLOBAL_ORDER => {
                self.manpower_type = cycle(self.manpower_type, ManpowerType::ALL.len())
            }
            WORK_GLOBAL_ORDER => {
                self.engaged_to = cycle(self.engaged_to, WorkCategory::ALL.len())
            }
            _ => {
                if let Some(field) = self.current_input() {
                    if right {
                        field.move_cursor_right()
                    } else {
                        field.move_cursor_left()
                    }
                }
            }
        }
    }

    pub fn to_draft(&self) -> Result<ManpowerDraft, String> {
        let date = NaiveDate::parse_from_str(self.date.trimmed(), "%Y-%m-%d")
            .map_err(|_| "Date is required (YYYY-MM-DD)".to_string())?;
        let count = match self.count.trimmed() {
            "" => 1,
            raw => raw
                .parse::<u32>()
                .map_err(|_| "Number of manpower must be a whole number".to_string())?,
        };
        let perday_cost = match self.cost.trimmed() {
            "" => None,
            raw => {
                let v = raw.parse::<f64>().map_err(|_| "Per-day cost must be a number".to_string())?;
                Some(check_amount(v, "Per-day cost")?)
            }
        };
        let draft = ManpowerDraft {
            date: Some(date),
            manpower_type: Some(self.selected_type()),
            engaged_to: Some(self.selected_work()),
            number_of_manpower: Some(count),
            perday_cost,
        };
        draft.check_headcount()?;
        Ok(draft)
    }
}

impl Default for ManpowerForm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::fixtures::manpower;

    #[test]
    fn new_form_requires_date() {
        let form = ManpowerForm::new();
        assert_eq!(form.to_draft().unwrap_err(), "Date is required (YYYY-MM-DD)");
    }

    #[test]
    fn builds_draft_from_selectors() {
        let mut form = ManpowerForm::new();
        for c in "2025-02-03".chars() {
            form.handle_char(c);
        }
        form.next_field();
        form.handle_left_right(false);
        form.next_field();
        form.handle_left_right(true);
        let draft = form.to_draft().unwrap();
        assert_eq!(draft.manpower_type, Some(ManpowerType::Labour));
        assert_eq!(draft.engaged_to, Some(WorkCategory::BrickWork));
        assert_eq!(draft.number_of_manpower, Some(1));
        assert_eq!(draft.perday_cost, None);
        assert_eq!(draft.date, NaiveDate::from_ymd_opt(2025, 2, 3));
    }

    #[test]
    fn rejects_zero_headcount() {
        let mut form = ManpowerForm::from_record(&manpower(4, "2025-01-05", ManpowerType::Engineer, 2));
        assert_eq!(form.selected_type(), ManpowerType::Engineer);
        form.count.set("0");
        assert!(form.to_draft().unwrap_err().contains("at least 1"));
        form.count.set("3");
        form.cost.set("250.5");
        assert_eq!(form.to_draft().unwrap_err(), "Per-day cost must be a whole amount of 0 or more");
        form.cost.set("250");
        let draft = form.to_draft().unwrap();
        assert_eq!(draft.perday_cost, Some(250.0));
        assert_eq!(form.title(), "Edit Manpower Record 4");
    }
}
