use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

/// Platform role. Admin status is a separate flag, not a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Learner,
    Instructor,
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Learner
    }
}

/// User account (stored in MongoDB, `users` collection).
///
/// `subject_id` is the stable identifier issued by the identity provider and
/// is the natural key of the collection - one document per subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// PRIMARY IDENTIFIER - subject id from the identity provider
    pub subject_id: String,

    pub email: String,

    pub full_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    #[serde(default)]
    pub role: UserRole,

    #[serde(default)]
    pub is_admin: bool,

    /// Instructors go through manual approval before being listed publicly
    #[serde(default)]
    pub approved_instructor: bool,

    pub created_at: Option<BsonDateTime>,
    pub updated_at: Option<BsonDateTime>,
}

/// Reduced projection of a user record, safe to expose publicly.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PublicProfile {
    pub subject_id: String,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    pub role: UserRole,
    pub is_admin: bool,
}

impl From<User> for PublicProfile {
    fn from(user: User) -> Self {
        PublicProfile {
            subject_id: user.subject_id,
            email: user.email,
            full_name: user.full_name,
            picture: user.picture,
            role: user.role,
            is_admin: user.is_admin,
        }
    }
}

/// Role and admin status, for authorization checks by the frontend.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RoleInfo {
    pub role: UserRole,
    pub is_admin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_defaults_to_learner() {
        assert_eq!(UserRole::default(), UserRole::Learner);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&UserRole::Instructor).unwrap(),
            "\"instructor\""
        );
        let role: UserRole = serde_json::from_str("\"learner\"").unwrap();
        assert_eq!(role, UserRole::Learner);
    }

    #[test]
    fn test_public_profile_drops_internal_fields() {
        let user = User {
            id: Some(ObjectId::new()),
            subject_id: "user_2abc".to_string(),
            email: "ada@example.com".to_string(),
            full_name: "Ada Lovelace".to_string(),
            picture: None,
            role: UserRole::Instructor,
            is_admin: false,
            approved_instructor: true,
            created_at: None,
            updated_at: None,
        };

        let profile = PublicProfile::from(user);
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["subject_id"], "user_2abc");
        assert!(json.get("approved_instructor").is_none());
        assert!(json.get("_id").is_none());
    }
}
