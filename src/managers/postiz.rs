use crate::constants::posts as post_defaults;
use crate::errors::{ApiError, NodeError, ToolError};
use crate::managers::gateway::ApiGateway;
use crate::services::execution::{execute_batch, ExecutionContext, JsonExecution, Node, Parameters};
use crate::services::logger::Logger;
use crate::services::request::{MultipartPayload, Query};
use crate::services::tool_executor::ToolHandler;
use crate::services::validation::Validation;
use crate::utils::collection::{
    flatten_pairs, read_group, record_text, write_group, GroupRecord, KeyValue,
};
use crate::utils::tool_errors::unknown_operation_error;
use async_trait::async_trait;
use chrono::Datelike;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostizOperationKind {
    CreatePost,
    DeletePost,
    GenerateVideo,
    GetIntegrations,
    GetPosts,
    UploadFile,
    VideoFunction,
}

impl PostizOperationKind {
    pub const ALL: [PostizOperationKind; 7] = [
        PostizOperationKind::CreatePost,
        PostizOperationKind::DeletePost,
        PostizOperationKind::GenerateVideo,
        PostizOperationKind::GetIntegrations,
        PostizOperationKind::GetPosts,
        PostizOperationKind::UploadFile,
        PostizOperationKind::VideoFunction,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PostizOperationKind::CreatePost => "createPost",
            PostizOperationKind::DeletePost => "deletePost",
            PostizOperationKind::GenerateVideo => "generateVideo",
            PostizOperationKind::GetIntegrations => "getIntegrations",
            PostizOperationKind::GetPosts => "getPosts",
            PostizOperationKind::UploadFile => "uploadFile",
            PostizOperationKind::VideoFunction => "videoFunction",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|kind| kind.as_str()).collect()
    }

    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Draft,
    Schedule,
    Now,
}

impl PostType {
    fn parse(raw: &str) -> Result<Self, ToolError> {
        match raw.trim() {
            "draft" => Ok(PostType::Draft),
            "schedule" => Ok(PostType::Schedule),
            "now" | "" => Ok(PostType::Now),
            other => Err(ToolError::invalid_params(format!(
                "type must be one of draft, schedule, now (got \"{}\")",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub value: String,
    pub label: String,
}

impl GroupRecord for Tag {
    fn from_record(
        record: &Map<String, Value>,
        validation: &Validation,
    ) -> Result<Self, ToolError> {
        Ok(Self {
            value: record_text(record, "value", validation)?,
            label: record_text(record, "label", validation)?,
        })
    }

    fn to_record(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("value".to_string(), Value::String(self.value.clone()));
        map.insert("label".to_string(), Value::String(self.label.clone()));
        map
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub id: String,
    pub path: String,
}

impl GroupRecord for Image {
    fn from_record(
        record: &Map<String, Value>,
        validation: &Validation,
    ) -> Result<Self, ToolError> {
        Ok(Self {
            id: record_text(record, "id", validation)?,
            path: record_text(record, "path", validation)?,
        })
    }

    fn to_record(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        map.insert("path".to_string(), Value::String(self.path.clone()));
        map
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostContent {
    pub content: String,
    pub id: String,
    #[serde(rename = "image")]
    pub images: Vec<Image>,
}

const IMAGE_GROUP: &str = "imageItem";
const CONTENT_GROUP: &str = "contentItem";
const SETTING_GROUP: &str = "setting";
const TAG_GROUP: &str = "tag";
const POST_GROUP: &str = "post";
const PARAMETER_GROUP: &str = "parameter";

impl GroupRecord for PostContent {
    fn from_record(
        record: &Map<String, Value>,
        validation: &Validation,
    ) -> Result<Self, ToolError> {
        Ok(Self {
            content: record_text(record, "content", validation)?,
            id: record_text(record, "id", validation)?,
            images: read_group(record.get("image").unwrap_or(&Value::Null), IMAGE_GROUP)?,
        })
    }

    fn to_record(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("content".to_string(), Value::String(self.content.clone()));
        map.insert("id".to_string(), Value::String(self.id.clone()));
        map.insert("image".to_string(), write_group(&self.images, IMAGE_GROUP));
        map
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Integration {
    pub id: String,
}

fn serialize_settings<S: Serializer>(pairs: &[KeyValue], serializer: S) -> Result<S::Ok, S::Error> {
    flatten_pairs(pairs.iter().cloned()).serialize(serializer)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostEntry {
    pub integration: Integration,
    pub value: Vec<PostContent>,
    pub group: String,
    /// Provider-specific settings; flattened on the wire, later keys win.
    #[serde(serialize_with = "serialize_settings")]
    pub settings: Vec<KeyValue>,
}

impl GroupRecord for PostEntry {
    fn from_record(
        record: &Map<String, Value>,
        validation: &Validation,
    ) -> Result<Self, ToolError> {
        Ok(Self {
            integration: Integration {
                id: record_text(record, "integrationId", validation)?,
            },
            value: read_group(record.get("value").unwrap_or(&Value::Null), CONTENT_GROUP)?,
            group: record_text(record, "group", validation)?,
            settings: read_group(record.get("settings").unwrap_or(&Value::Null), SETTING_GROUP)?,
        })
    }

    fn to_record(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(
            "integrationId".to_string(),
            Value::String(self.integration.id.clone()),
        );
        map.insert("group".to_string(), Value::String(self.group.clone()));
        map.insert("settings".to_string(), write_group(&self.settings, SETTING_GROUP));
        map.insert("value".to_string(), write_group(&self.value, CONTENT_GROUP));
        map
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePost {
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub short_link: bool,
    pub date: String,
    pub tags: Vec<Tag>,
    pub posts: Vec<PostEntry>,
}

impl CreatePost {
    fn from_parameters(params: &Parameters<'_>) -> Result<Self, ToolError> {
        let post_type = PostType::parse(&params.string_or("type", "now")?)?;
        let tags = read_group(&params.value_or("tags", Value::Null), TAG_GROUP)?;
        let posts: Vec<PostEntry> = read_group(&params.value_or("posts", Value::Null), POST_GROUP)?;
        if post_type != PostType::Draft && posts.is_empty() {
            return Err(ToolError::invalid_params(
                "At least one post is required unless the type is draft",
            ));
        }
        Ok(Self {
            post_type,
            short_link: params.bool_or("shortLink", false)?,
            date: params.string("date")?,
            tags,
            posts,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostsDisplay {
    Day,
    Week,
    Month,
}

impl PostsDisplay {
    fn parse(raw: &str) -> Result<Self, ToolError> {
        match raw.trim() {
            "day" => Ok(PostsDisplay::Day),
            "week" => Ok(PostsDisplay::Week),
            "month" => Ok(PostsDisplay::Month),
            other => Err(ToolError::invalid_params(format!(
                "display must be one of day, week, month (got \"{}\")",
                other
            ))),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            PostsDisplay::Day => "day",
            PostsDisplay::Week => "week",
            PostsDisplay::Month => "month",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetPosts {
    pub week: i64,
    pub day: i64,
    pub display: PostsDisplay,
    pub month: i64,
    pub year: i64,
    pub customer: Option<String>,
}

impl GetPosts {
    fn from_parameters(params: &Parameters<'_>) -> Result<Self, ToolError> {
        let customer = params.string("customer")?;
        Ok(Self {
            week: params.integer_or("week", post_defaults::DEFAULT_WEEK)?,
            day: params.integer_or("day", post_defaults::DEFAULT_DAY)?,
            display: PostsDisplay::parse(
                &params.string_or("display", post_defaults::DEFAULT_DISPLAY)?,
            )?,
            month: params.integer_or("month", post_defaults::DEFAULT_MONTH)?,
            year: params.integer_or("year", chrono::Utc::now().year() as i64)?,
            customer: (!customer.is_empty()).then_some(customer),
        })
    }

    pub fn to_query(&self) -> Query {
        let mut query = Query::new();
        query.insert("week".to_string(), Value::from(self.week));
        query.insert("day".to_string(), Value::from(self.day));
        query.insert(
            "display".to_string(),
            Value::String(self.display.as_str().to_string()),
        );
        query.insert("month".to_string(), Value::from(self.month));
        query.insert("year".to_string(), Value::from(self.year));
        if let Some(customer) = &self.customer {
            query.insert("customer".to_string(), Value::String(customer.clone()));
        }
        query
    }
}

/// Builds the upload body from a binary attachment on the current item.
fn upload_payload(params: &Parameters<'_>) -> Result<MultipartPayload, ToolError> {
    let property = params.required_string("binaryPropertyName")?;
    let binary = params.binary(&property)?;
    let bytes = binary.bytes()?;
    if bytes.is_empty() {
        return Err(ToolError::invalid_params(format!(
            "Binary property '{}' has no data",
            property
        )));
    }
    let mime_type = binary
        .mime_type
        .clone()
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| {
            ToolError::invalid_params(format!("Binary property '{}' has no MIME type", property))
        })?;
    let file_name = binary
        .file_name
        .clone()
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| {
            ToolError::invalid_params(format!("Binary property '{}' has no file name", property))
        })?;
    Ok(MultipartPayload {
        field: post_defaults::UPLOAD_FIELD.to_string(),
        file_name,
        mime_type,
        bytes,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoOutput {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateVideo {
    #[serde(rename = "type")]
    pub video_type: String,
    pub output: VideoOutput,
    #[serde(rename = "customParams", serialize_with = "serialize_settings")]
    pub custom_params: Vec<KeyValue>,
}

/// Values that parse as JSON are sent as JSON, anything else as text.
fn parse_loose_json(pair: KeyValue) -> KeyValue {
    let value = match &pair.value {
        Value::String(raw) => serde_json::from_str(raw).unwrap_or_else(|_| pair.value.clone()),
        other => other.clone(),
    };
    KeyValue::new(pair.key, value)
}

impl GenerateVideo {
    fn from_parameters(params: &Parameters<'_>) -> Result<Self, ToolError> {
        let output = match params.string_or("output", "vertical")?.trim() {
            "vertical" => VideoOutput::Vertical,
            "horizontal" => VideoOutput::Horizontal,
            other => {
                return Err(ToolError::invalid_params(format!(
                    "output must be vertical or horizontal (got \"{}\")",
                    other
                )))
            }
        };
        let video_type = params.string_or("videoType", post_defaults::DEFAULT_VIDEO_TYPE)?;
        let video_type = video_type.trim();
        if video_type.is_empty() {
            return Err(ToolError::invalid_params("videoType must be a non-empty string"));
        }
        let pairs: Vec<KeyValue> =
            read_group(&params.value_or("customParameters", Value::Null), PARAMETER_GROUP)?;
        Ok(Self {
            video_type: video_type.to_string(),
            output,
            custom_params: pairs.into_iter().map(parse_loose_json).collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoFunction {
    pub function_name: String,
    pub identifier: String,
    pub params: Vec<KeyValue>,
}

impl VideoFunction {
    fn from_parameters(params: &Parameters<'_>) -> Result<Self, ToolError> {
        Ok(Self {
            function_name: params.required_string("functionName")?,
            identifier: params.required_string("identifier")?,
            params: read_group(
                &params.value_or("additionalParameters", Value::Null),
                PARAMETER_GROUP,
            )?,
        })
    }

    /// Additional parameters land on the top level and may overwrite
    /// `functionName` or `identifier`.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert(
            "functionName".to_string(),
            Value::String(self.function_name.clone()),
        );
        body.insert("identifier".to_string(), Value::String(self.identifier.clone()));
        body.extend(flatten_pairs(self.params.iter().cloned()));
        Value::Object(body)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PostizOperation {
    CreatePost(CreatePost),
    DeletePost { post_id: String },
    GenerateVideo(GenerateVideo),
    GetIntegrations,
    GetPosts(GetPosts),
    UploadFile(MultipartPayload),
    VideoFunction(VideoFunction),
}

impl PostizOperation {
    pub fn from_parameters(params: &Parameters<'_>) -> Result<Self, ToolError> {
        let name = params.string_or("operation", PostizOperationKind::CreatePost.as_str())?;
        let kind = PostizOperationKind::lookup(&name).ok_or_else(|| {
            unknown_operation_error("Postiz", &name, &PostizOperationKind::names())
        })?;
        Ok(match kind {
            PostizOperationKind::CreatePost => {
                PostizOperation::CreatePost(CreatePost::from_parameters(params)?)
            }
            PostizOperationKind::DeletePost => PostizOperation::DeletePost {
                post_id: params.required_string("postId")?,
            },
            PostizOperationKind::GenerateVideo => {
                PostizOperation::GenerateVideo(GenerateVideo::from_parameters(params)?)
            }
            PostizOperationKind::GetIntegrations => PostizOperation::GetIntegrations,
            PostizOperationKind::GetPosts => {
                PostizOperation::GetPosts(GetPosts::from_parameters(params)?)
            }
            PostizOperationKind::UploadFile => PostizOperation::UploadFile(upload_payload(params)?),
            PostizOperationKind::VideoFunction => {
                PostizOperation::VideoFunction(VideoFunction::from_parameters(params)?)
            }
        })
    }

    pub fn kind(&self) -> PostizOperationKind {
        match self {
            PostizOperation::CreatePost(_) => PostizOperationKind::CreatePost,
            PostizOperation::DeletePost { .. } => PostizOperationKind::DeletePost,
            PostizOperation::GenerateVideo(_) => PostizOperationKind::GenerateVideo,
            PostizOperation::GetIntegrations => PostizOperationKind::GetIntegrations,
            PostizOperation::GetPosts(_) => PostizOperationKind::GetPosts,
            PostizOperation::UploadFile(_) => PostizOperationKind::UploadFile,
            PostizOperation::VideoFunction(_) => PostizOperationKind::VideoFunction,
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value)
        .map_err(|err| ApiError::new("Postiz", format!("Failed to encode request body: {}", err)))
}

#[derive(Clone)]
pub struct PostizNode {
    logger: Logger,
    gateway: ApiGateway,
}

impl PostizNode {
    pub fn new(logger: Logger, gateway: ApiGateway) -> Self {
        Self {
            logger: logger.child("postiz"),
            gateway,
        }
    }

    pub fn gateway(&self) -> &ApiGateway {
        &self.gateway
    }

    pub async fn run(&self, operation: PostizOperation) -> Result<Value, ApiError> {
        match operation {
            PostizOperation::CreatePost(post) => self.gateway.post("/posts", to_json(&post)?).await,
            PostizOperation::GetPosts(query) => {
                self.gateway.get_with_query("/posts", query.to_query()).await
            }
            PostizOperation::UploadFile(payload) => self.gateway.post("/upload", payload).await,
            PostizOperation::GetIntegrations => self.gateway.get("/integrations").await,
            PostizOperation::DeletePost { post_id } => {
                self.gateway.delete(&format!("/posts/{}", post_id)).await
            }
            PostizOperation::GenerateVideo(video) => {
                self.gateway.post("/generate-video", to_json(&video)?).await
            }
            PostizOperation::VideoFunction(function) => {
                self.gateway.post("/video/function", function.to_body()).await
            }
        }
    }
}

#[async_trait]
impl Node for PostizNode {
    fn name(&self) -> &'static str {
        "Postiz"
    }

    async fn execute_item(
        &self,
        ctx: &dyn ExecutionContext,
        index: usize,
    ) -> Result<Value, NodeError> {
        let params = Parameters::new(ctx, index);
        let operation = PostizOperation::from_parameters(&params)?;
        self.logger.debug(
            "Running operation",
            Some(&serde_json::json!({"operation": operation.kind().as_str(), "item": index})),
        );
        Ok(self.run(operation).await?)
    }
}

#[async_trait]
impl ToolHandler for PostizNode {
    async fn handle(&self, args: Value) -> Result<Value, ToolError> {
        match args.get("action").and_then(|v| v.as_str()).unwrap_or("execute") {
            "execute" => {
                let ctx = JsonExecution::from_args(&args)?;
                let output = execute_batch(self, &ctx, &self.logger).await;
                Ok(serde_json::json!({
                    "items": output.to_host_items(),
                    "outcomes": output.outcomes,
                }))
            }
            "test_credentials" => {
                let result = self.gateway.test_credentials().await;
                Ok(serde_json::to_value(result).unwrap_or(Value::Null))
            }
            other => Err(ToolError::invalid_params(format!(
                "Unknown postiz action: {}",
                other
            ))
            .with_hint("Use one of: execute, test_credentials.")),
        }
    }
}
