//! Employee list returned by the HR API

use serde_json::Value;

/// Keys under which an employee array may be wrapped
const LIST_KEYS: [&str; 5] = ["data", "employees", "users", "items", "records"];

/// An employee entry as far as user import cares
#[derive(Debug, Clone, PartialEq)]
pub struct Employee {
    /// Employee id; `None` when missing or empty
    pub emp_id: Option<String>,
    /// Display name (`fpt_emp_name`), empty when absent
    pub name: String,
    /// The entry as received
    pub raw: Value,
}

impl Employee {
    pub fn from_value(raw: Value) -> Self {
        let emp_id = match raw.get("emp_id") {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) if n.as_i64() != Some(0) => Some(n.to_string()),
            _ => None,
        };
        let name = match raw.get("fpt_emp_name") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        Self { emp_id, name, raw }
    }
}

/// Pull the employee entries out of a response body.
///
/// Accepts a bare array, an object holding an array under one of the usual
/// keys, or a single object carrying `emp_id`.
pub fn extract_employees(body: Value) -> Vec<Employee> {
    let entries = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let key = LIST_KEYS
                .iter()
                .find(|key| matches!(map.get(**key), Some(Value::Array(_))));
            match key.and_then(|key| map.remove(*key)) {
                Some(Value::Array(items)) => items,
                _ if map.contains_key("emp_id") => vec![Value::Object(map)],
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    };

    entries.into_iter().map(Employee::from_value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!([{"emp_id": "1"}, {"emp_id": "2"}]), 2)]
    #[case(json!({"data": [{"emp_id": "1"}]}), 1)]
    #[case(json!({"employees": [{"emp_id": "1"}, {"emp_id": 2}]}), 2)]
    #[case(json!({"records": [{"emp_id": "1"}]}), 1)]
    #[case(json!({"emp_id": "5", "fpt_emp_name": "Solo"}), 1)]
    #[case(json!({"data": "not a list", "total": 0}), 0)]
    #[case(json!("nope"), 0)]
    fn test_extract_shapes(#[case] body: Value, #[case] expected: usize) {
        assert_eq!(extract_employees(body).len(), expected);
    }

    #[test]
    fn test_employee_fields() {
        let employees = extract_employees(json!([
            {"emp_id": 1001, "fpt_emp_name": "Alice"},
            {"emp_id": "", "fpt_emp_name": "Nobody"},
            {"emp_id": "1002", "fpt_emp_name": null},
        ]));

        assert_eq!(employees[0].emp_id.as_deref(), Some("1001"));
        assert_eq!(employees[0].name, "Alice");
        assert_eq!(employees[1].emp_id, None);
        assert_eq!(employees[2].name, "");
    }
}
