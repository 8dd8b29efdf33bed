//! Enrollment and grade tools.
//!
//! These are the name-driven tools: the agent supplies a human name, the
//! resolver turns it into a user ID, and the remaining call is a plain
//! `core_enrol_*` / `gradereport_*` wrapper.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::{require_str, Tool};
use crate::moodle::MoodleClient;
use crate::resolve::find_user_by_name;

/// Accepted role names and their Moodle role IDs. Spanish aliases are kept
/// because the agent converses in Spanish.
const ROLE_MAP: &[(&str, i64)] = &[
    ("teacher", 3),
    ("profesor", 3),
    ("student", 5),
    ("estudiante", 5),
    ("alumno", 5),
];

fn role_id(role: &str) -> Option<i64> {
    let role = role.to_lowercase();
    ROLE_MAP
        .iter()
        .find(|(name, _)| *name == role)
        .map(|(_, id)| *id)
}

fn numeric_id(entity: &Value) -> Option<i64> {
    entity.get("id").and_then(Value::as_i64)
}

// ── GetUserCoursesTool ─────────────────────────────────────────────

pub struct GetUserCoursesTool {
    client: Arc<MoodleClient>,
}

impl GetUserCoursesTool {
    pub fn new(client: Arc<MoodleClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetUserCoursesTool {
    fn name(&self) -> &str {
        "get_user_courses"
    }

    fn description(&self) -> &str {
        "Obtiene la lista de cursos en los que está inscrito un usuario, \
         buscándolo por su nombre completo."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_name": {
                    "type": "string",
                    "description": "Nombre completo del usuario"
                }
            },
            "required": ["user_name"]
        })
    }

    async fn execute(&self, args: HashMap<String, Value>) -> String {
        let user_name = match require_str(&args, "user_name") {
            Ok(v) => v,
            Err(msg) => return msg,
        };

        let user = match find_user_by_name(&self.client, user_name).await {
            Ok(user) => user,
            Err(message) => return message,
        };
        let Some(user_id) = numeric_id(&user) else {
            return "Error: la respuesta de Moodle no incluía el ID del usuario.".into();
        };

        let params = vec![("userid".to_string(), user_id.to_string())];
        match self
            .client
            .call("core_enrol_get_users_courses", &params)
            .await
        {
            Ok(body) => body.to_string(),
            Err(e) => e.to_string(),
        }
    }
}

// ── GetUserGradesTool ──────────────────────────────────────────────

pub struct GetUserGradesTool {
    client: Arc<MoodleClient>,
}

impl GetUserGradesTool {
    pub fn new(client: Arc<MoodleClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetUserGradesTool {
    fn name(&self) -> &str {
        "get_user_grades"
    }

    fn description(&self) -> &str {
        "Obtiene una vista general de las calificaciones de un usuario en \
         todos sus cursos."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_name": {
                    "type": "string",
                    "description": "Nombre completo del usuario"
                }
            },
            "required": ["user_name"]
        })
    }

    async fn execute(&self, args: HashMap<String, Value>) -> String {
        let user_name = match require_str(&args, "user_name") {
            Ok(v) => v,
            Err(msg) => return msg,
        };

        let user = match find_user_by_name(&self.client, user_name).await {
            Ok(user) => user,
            Err(message) => return message,
        };
        let Some(user_id) = numeric_id(&user) else {
            return "Error: la respuesta de Moodle no incluía el ID del usuario.".into();
        };

        let params = vec![("userid".to_string(), user_id.to_string())];
        match self
            .client
            .call("gradereport_overview_get_course_grades", &params)
            .await
        {
            Ok(body) => body.to_string(),
            Err(e) => e.to_string(),
        }
    }
}

// ── EnrolUserTool ──────────────────────────────────────────────────

pub struct EnrolUserTool {
    client: Arc<MoodleClient>,
}

impl EnrolUserTool {
    pub fn new(client: Arc<MoodleClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for EnrolUserTool {
    fn name(&self) -> &str {
        "enrol_user_in_course"
    }

    fn description(&self) -> &str {
        "Inscribe (matricula) a un usuario en un curso con un rol específico. \
         Los roles válidos son 'student' (estudiante/alumno) o 'teacher' \
         (profesor)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_name": {
                    "type": "string",
                    "description": "Nombre completo del usuario a inscribir"
                },
                "course_id": {
                    "type": "integer",
                    "description": "ID numérico del curso"
                },
                "role": {
                    "type": "string",
                    "description": "Rol: 'student' o 'teacher' (también 'estudiante', 'alumno', 'profesor')"
                }
            },
            "required": ["user_name", "course_id", "role"]
        })
    }

    async fn execute(&self, args: HashMap<String, Value>) -> String {
        let user_name = match require_str(&args, "user_name") {
            Ok(v) => v,
            Err(msg) => return msg,
        };
        let Some(course_id) = args.get("course_id").and_then(Value::as_i64) else {
            return "Error: el parámetro 'course_id' es obligatorio.".into();
        };
        let role = match require_str(&args, "role") {
            Ok(v) => v,
            Err(msg) => return msg,
        };

        let user = match find_user_by_name(&self.client, user_name).await {
            Ok(user) => user,
            Err(message) => return message,
        };
        let Some(user_id) = numeric_id(&user) else {
            return "Error: la respuesta de Moodle no incluía el ID del usuario.".into();
        };

        let Some(role_id) = role_id(role) else {
            return "Error: Rol no válido. Usa 'student' o 'teacher'.".into();
        };

        let params = vec![
            MoodleClient::entry("enrolments", 0, "roleid", role_id),
            MoodleClient::entry("enrolments", 0, "userid", user_id),
            MoodleClient::entry("enrolments", 0, "courseid", course_id),
        ];

        match self.client.call("enrol_manual_enrol_users", &params).await {
            // A successful manual enrolment returns null; synthesize a
            // confirmation the agent can relay.
            Ok(Value::Null) => json!({
                "status": "success",
                "message": format!("Usuario {user_name} inscrito en el curso {course_id}.")
            })
            .to_string(),
            Ok(body) => body.to_string(),
            Err(e) => e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MoodleConfig;
    use httpmock::prelude::*;

    #[test]
    fn test_role_map_accepts_spanish_aliases() {
        assert_eq!(role_id("teacher"), Some(3));
        assert_eq!(role_id("Profesor"), Some(3));
        assert_eq!(role_id("student"), Some(5));
        assert_eq!(role_id("ESTUDIANTE"), Some(5));
        assert_eq!(role_id("alumno"), Some(5));
        assert_eq!(role_id("director"), None);
    }

    async fn client_for(server: &MockServer) -> Arc<MoodleClient> {
        server
            .mock_async(|when, then| {
                when.method(POST).path("/login/token.php");
                then.status(200).json_body(json!({"token": "abc123"}));
            })
            .await;

        let mut config = MoodleConfig {
            url: server.base_url(),
            admin_username: "admin".into(),
            admin_password: "secret".into(),
            service_shortname: "moodlebot_ws".into(),
        };
        config.normalize();
        Arc::new(MoodleClient::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_invalid_role_never_reaches_enrolment() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/webservice/rest/server.php")
                    .body_includes("wsfunction=core_user_get_users");
                then.status(200).json_body(json!({
                    "users": [{"fullname": "Juan Pérez", "id": 7}]
                }));
            })
            .await;
        let enrol_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/webservice/rest/server.php")
                    .body_includes("wsfunction=enrol_manual_enrol_users");
                then.status(200).json_body(json!(null));
            })
            .await;

        let tool = EnrolUserTool::new(client_for(&server).await);
        let mut args = HashMap::new();
        args.insert("user_name".to_string(), json!("Juan Pérez"));
        args.insert("course_id".to_string(), json!(42));
        args.insert("role".to_string(), json!("director"));

        let result = tool.execute(args).await;
        assert_eq!(result, "Error: Rol no válido. Usa 'student' o 'teacher'.");
        enrol_mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_successful_enrolment_synthesizes_confirmation() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/webservice/rest/server.php")
                    .body_includes("wsfunction=core_user_get_users");
                then.status(200).json_body(json!({
                    "users": [{"fullname": "Juan Pérez", "id": 7}]
                }));
            })
            .await;
        let enrol_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/webservice/rest/server.php")
                    .body_includes("wsfunction=enrol_manual_enrol_users")
                    .body_includes("userid%5D=7");
                then.status(200).json_body(json!(null));
            })
            .await;

        let tool = EnrolUserTool::new(client_for(&server).await);
        let mut args = HashMap::new();
        args.insert("user_name".to_string(), json!("Juan Pérez"));
        args.insert("course_id".to_string(), json!(42));
        args.insert("role".to_string(), json!("student"));

        let result = tool.execute(args).await;
        assert!(result.contains("\"status\":\"success\""));
        assert!(result.contains("curso 42"));
        enrol_mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_ambiguous_user_aborts_enrolment() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/webservice/rest/server.php")
                    .body_includes("wsfunction=core_user_get_users");
                then.status(200).json_body(json!({
                    "users": [
                        {"fullname": "Ana Lopez", "id": 5},
                        {"fullname": "Ana Ruiz", "id": 9}
                    ]
                }));
            })
            .await;
        let enrol_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/webservice/rest/server.php")
                    .body_includes("wsfunction=enrol_manual_enrol_users");
                then.status(200).json_body(json!(null));
            })
            .await;

        let tool = EnrolUserTool::new(client_for(&server).await);
        let mut args = HashMap::new();
        args.insert("user_name".to_string(), json!("Ana"));
        args.insert("course_id".to_string(), json!(42));
        args.insert("role".to_string(), json!("student"));

        let result = tool.execute(args).await;
        assert!(result.contains("Encontré varios usuarios"));
        enrol_mock.assert_hits_async(0).await;
    }
}
