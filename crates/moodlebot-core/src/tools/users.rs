//! User administration tools: lookup, listing, create, update, delete.
//!
//! Each tool is a thin wrapper around one `core_user_*` web-service
//! function; `get_user_info` additionally goes through the name resolver so
//! the agent can work from a human name instead of a numeric ID.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::{require_str, Tool};
use crate::moodle::MoodleClient;
use crate::resolve::find_user_by_name;

// ── GetUserInfoTool ────────────────────────────────────────────────

pub struct GetUserInfoTool {
    client: Arc<MoodleClient>,
}

impl GetUserInfoTool {
    pub fn new(client: Arc<MoodleClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetUserInfoTool {
    fn name(&self) -> &str {
        "get_user_info"
    }

    fn description(&self) -> &str {
        "Busca y devuelve la información completa de un usuario de Moodle por \
         su nombre completo. Es útil para obtener el ID, email, etc., de una \
         persona."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_name": {
                    "type": "string",
                    "description": "Nombre completo del usuario a buscar"
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

        match find_user_by_name(&self.client, user_name).await {
            Ok(user) => user.to_string(),
            Err(message) => message,
        }
    }
}

// ── ListAllUsersTool ───────────────────────────────────────────────

pub struct ListAllUsersTool {
    client: Arc<MoodleClient>,
}

impl ListAllUsersTool {
    pub fn new(client: Arc<MoodleClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ListAllUsersTool {
    fn name(&self) -> &str {
        "list_all_users"
    }

    fn description(&self) -> &str {
        "Obtiene una lista de todos los usuarios registrados en la plataforma Moodle."
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}, "required": []})
    }

    async fn execute(&self, _args: HashMap<String, Value>) -> String {
        // core_user_get_users has no "list everything" mode; an email
        // criteria of "%" matches every account.
        let params = vec![
            MoodleClient::entry("criteria", 0, "key", "email"),
            MoodleClient::entry("criteria", 0, "value", "%"),
        ];

        match self.client.call("core_user_get_users", &params).await {
            Ok(body) => body.to_string(),
            Err(e) => e.to_string(),
        }
    }
}

// ── CreateUserTool ─────────────────────────────────────────────────

pub struct CreateUserTool {
    client: Arc<MoodleClient>,
}

impl CreateUserTool {
    pub fn new(client: Arc<MoodleClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for CreateUserTool {
    fn name(&self) -> &str {
        "create_user"
    }

    fn description(&self) -> &str {
        "Crea un nuevo usuario en Moodle con los datos proporcionados. Se \
         necesita un nombre de usuario, nombre, apellido, email y contraseña."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "username": {"type": "string", "description": "Nombre de usuario (login)"},
                "firstname": {"type": "string", "description": "Nombre"},
                "lastname": {"type": "string", "description": "Apellido"},
                "email": {"type": "string", "description": "Dirección de correo"},
                "password": {"type": "string", "description": "Contraseña inicial"}
            },
            "required": ["username", "firstname", "lastname", "email", "password"]
        })
    }

    async fn execute(&self, args: HashMap<String, Value>) -> String {
        let mut fields = Vec::new();
        for key in ["username", "password", "firstname", "lastname", "email"] {
            match require_str(&args, key) {
                Ok(value) => fields.push(MoodleClient::entry("users", 0, key, value)),
                Err(msg) => return msg,
            }
        }
        fields.push(MoodleClient::entry("users", 0, "auth", "manual"));

        match self.client.call("core_user_create_users", &fields).await {
            Ok(body) => body.to_string(),
            Err(e) => e.to_string(),
        }
    }
}

// ── UpdateUserDataTool ─────────────────────────────────────────────

pub struct UpdateUserDataTool {
    client: Arc<MoodleClient>,
}

impl UpdateUserDataTool {
    pub fn new(client: Arc<MoodleClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for UpdateUserDataTool {
    fn name(&self) -> &str {
        "update_user_data"
    }

    fn description(&self) -> &str {
        "Actualiza los datos de un usuario existente identificado por su ID. \
         Puedes cambiar su email, nombre (firstname) o apellido (lastname)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_id": {"type": "integer", "description": "ID numérico del usuario"},
                "new_email": {"type": "string", "description": "Nuevo email (opcional)"},
                "new_firstname": {"type": "string", "description": "Nuevo nombre (opcional)"},
                "new_lastname": {"type": "string", "description": "Nuevo apellido (opcional)"}
            },
            "required": ["user_id"]
        })
    }

    async fn execute(&self, args: HashMap<String, Value>) -> String {
        let Some(user_id) = args.get("user_id").and_then(Value::as_i64) else {
            return "Error: el parámetro 'user_id' es obligatorio.".into();
        };

        let mut fields = vec![MoodleClient::entry("users", 0, "id", user_id)];
        for (arg, field) in [
            ("new_email", "email"),
            ("new_firstname", "firstname"),
            ("new_lastname", "lastname"),
        ] {
            if let Some(value) = args.get(arg).and_then(Value::as_str) {
                if !value.is_empty() {
                    fields.push(MoodleClient::entry("users", 0, field, value));
                }
            }
        }

        if fields.len() == 1 {
            return "Error: Debes proporcionar al menos un dato para actualizar \
                    (email, nombre o apellido)."
                .into();
        }

        match self.client.call("core_user_update_users", &fields).await {
            Ok(body) => body.to_string(),
            Err(e) => e.to_string(),
        }
    }
}

// ── DeleteUserTool ─────────────────────────────────────────────────

pub struct DeleteUserTool {
    client: Arc<MoodleClient>,
}

impl DeleteUserTool {
    pub fn new(client: Arc<MoodleClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for DeleteUserTool {
    fn name(&self) -> &str {
        "delete_user_by_id"
    }

    fn description(&self) -> &str {
        "Elimina permanentemente a un usuario de Moodle usando su ID numérico."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_id": {"type": "integer", "description": "ID numérico del usuario a eliminar"}
            },
            "required": ["user_id"]
        })
    }

    async fn execute(&self, args: HashMap<String, Value>) -> String {
        let Some(user_id) = args.get("user_id").and_then(Value::as_i64) else {
            return "Error: el parámetro 'user_id' es obligatorio.".into();
        };

        let params = vec![("userids[0]".to_string(), user_id.to_string())];
        match self.client.call("core_user_delete_users", &params).await {
            Ok(body) => body.to_string(),
            Err(e) => e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MoodleConfig;

    // Points at an unroutable address; tests below must return before any
    // network activity.
    fn offline_client() -> Arc<MoodleClient> {
        let config = MoodleConfig {
            url: "http://127.0.0.1:9".into(),
            admin_username: "admin".into(),
            admin_password: "secret".into(),
            service_shortname: "ws".into(),
        };
        Arc::new(MoodleClient::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_update_without_fields_is_rejected_locally() {
        let tool = UpdateUserDataTool::new(offline_client());
        let mut args = HashMap::new();
        args.insert("user_id".to_string(), json!(7));

        let result = tool.execute(args).await;
        assert_eq!(
            result,
            "Error: Debes proporcionar al menos un dato para actualizar \
             (email, nombre o apellido)."
        );
    }

    #[tokio::test]
    async fn test_update_ignores_empty_strings() {
        let tool = UpdateUserDataTool::new(offline_client());
        let mut args = HashMap::new();
        args.insert("user_id".to_string(), json!(7));
        args.insert("new_email".to_string(), json!(""));

        let result = tool.execute(args).await;
        assert!(result.starts_with("Error: Debes proporcionar"));
    }

    #[tokio::test]
    async fn test_create_user_requires_every_field() {
        let tool = CreateUserTool::new(offline_client());
        let mut args = HashMap::new();
        args.insert("username".to_string(), json!("jperez"));

        let result = tool.execute(args).await;
        assert!(result.contains("'password'"));
    }

    #[tokio::test]
    async fn test_delete_requires_numeric_id() {
        let tool = DeleteUserTool::new(offline_client());
        let mut args = HashMap::new();
        args.insert("user_id".to_string(), json!("siete"));

        let result = tool.execute(args).await;
        assert!(result.contains("'user_id'"));
    }
}
