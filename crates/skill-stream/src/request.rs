use serde::{Deserialize, Serialize};

use crate::errors::ClientError;

/// User input for a skill run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillInput {
    pub query: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

/// A resource referenced by the invocation context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    pub resource_id: String,
    /// Optional excerpt the user selected from the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
}

/// A document referenced by the invocation context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    pub doc_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
}

/// A prior result the skill may build on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRef {
    pub result_id: String,
}

/// Resources, documents and links attached to an invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationContext {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<DocumentRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
}

/// Parameters for one skill run. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRequest {
    result_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    skill_name: Option<String>,
    input: SkillInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    locale: Option<String>,
    #[serde(default)]
    context: InvocationContext,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    result_history: Vec<ResultRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tpl_config: Option<serde_json::Value>,
}

impl InvocationRequest {
    /// Starts building a request for the given query.
    pub fn builder(query: impl Into<String>) -> InvocationRequestBuilder {
        InvocationRequestBuilder::new(query)
    }

    pub fn result_id(&self) -> &str {
        &self.result_id
    }

    /// Target skill; `None` lets the server pick its default skill.
    pub fn skill_name(&self) -> Option<&str> {
        self.skill_name.as_deref()
    }

    pub fn input(&self) -> &SkillInput {
        &self.input
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn context(&self) -> &InvocationContext {
        &self.context
    }

    pub fn result_history(&self) -> &[ResultRef] {
        &self.result_history
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn tpl_config(&self) -> Option<&serde_json::Value> {
        self.tpl_config.as_ref()
    }
}

/// Builder for [`InvocationRequest`].
///
/// Validation happens in [`InvocationRequestBuilder::build`].
#[derive(Clone, Debug)]
pub struct InvocationRequestBuilder {
    result_id: Option<String>,
    skill_name: Option<String>,
    input: SkillInput,
    model_name: Option<String>,
    locale: Option<String>,
    context: InvocationContext,
    result_history: Vec<ResultRef>,
    project_id: Option<String>,
    tpl_config: Option<serde_json::Value>,
}

impl InvocationRequestBuilder {
    fn new(query: impl Into<String>) -> Self {
        Self {
            result_id: None,
            skill_name: None,
            input: SkillInput {
                query: query.into(),
                images: Vec::new(),
            },
            model_name: None,
            locale: None,
            context: InvocationContext::default(),
            result_history: Vec::new(),
            project_id: None,
            tpl_config: None,
        }
    }

    /// Uses an existing result id instead of generating one.
    pub fn result_id(mut self, result_id: impl Into<String>) -> Self {
        self.result_id = Some(result_id.into());
        self
    }

    pub fn skill(mut self, skill_name: impl Into<String>) -> Self {
        self.skill_name = Some(skill_name.into());
        self
    }

    pub fn model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.input.images.push(image.into());
        self
    }

    pub fn resource(mut self, resource_id: impl Into<String>) -> Self {
        self.context.resources.push(ResourceRef {
            resource_id: resource_id.into(),
            selection: None,
        });
        self
    }

    pub fn document(mut self, doc_id: impl Into<String>) -> Self {
        self.context.documents.push(DocumentRef {
            doc_id: doc_id.into(),
            selection: None,
        });
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.context.urls.push(url.into());
        self
    }

    /// Replaces the whole context bundle.
    pub fn context(mut self, context: InvocationContext) -> Self {
        self.context = context;
        self
    }

    pub fn previous_result(mut self, result_id: impl Into<String>) -> Self {
        self.result_history.push(ResultRef {
            result_id: result_id.into(),
        });
        self
    }

    pub fn project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn tpl_config(mut self, config: serde_json::Value) -> Self {
        self.tpl_config = Some(config);
        self
    }

    pub fn build(self) -> Result<InvocationRequest, ClientError> {
        if self.input.query.trim().is_empty() {
            return Err(ClientError::Validation("query must not be empty".into()));
        }
        if self
            .skill_name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(ClientError::Validation(
                "skill name must not be blank when set".into(),
            ));
        }
        if self
            .model_name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(ClientError::Validation(
                "model name must not be blank when set".into(),
            ));
        }
        let result_id = match self.result_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => format!("ar-{}", uuid::Uuid::new_v4()),
        };

        Ok(InvocationRequest {
            result_id,
            skill_name: self.skill_name,
            input: self.input,
            model_name: self.model_name,
            locale: self.locale,
            context: self.context,
            result_history: self.result_history,
            project_id: self.project_id,
            tpl_config: self.tpl_config,
        })
    }
}
