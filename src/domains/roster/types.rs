use serde::{Deserialize, Serialize};

/// Student document, `Studios/{studio}/Students/{id}`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Student {
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub family_id: Option<String>,
    /// Ids of the classes the student is enrolled in
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl Student {
    /// The student's family, ignoring blank ids.
    pub fn family(&self) -> Option<&str> {
        self.family_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Class document, `Studios/{studio}/Classes/{id}`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StudioClass {
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub season_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Family document, `Studios/{studio}/Families/{id}`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Family {
    #[serde(skip)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_student_family_ignores_blank_ids() {
        let mut student: Student =
            serde_json::from_value(json!({"FamilyId": "fam-1", "Classes": ["c1"]})).unwrap();
        assert_eq!(student.family(), Some("fam-1"));
        assert_eq!(student.classes, vec!["c1".to_string()]);

        student.family_id = Some("  ".into());
        assert_eq!(student.family(), None);

        let orphan: Student = serde_json::from_value(json!({"FirstName": "Ada"})).unwrap();
        assert_eq!(orphan.family(), None);
        assert!(orphan.classes.is_empty());
    }
}
