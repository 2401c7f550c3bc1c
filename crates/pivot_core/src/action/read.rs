//! Read actions backing the widget reload.

use super::{
    integer_param, parse_object_param, parse_type_param, ActionResponse, FeedbackLevel,
    PivotActions,
};
use crate::widget::{PivotWidget, WidgetError};
use serde::Deserialize;
use serde_json::Value;

/// Query of `GET pivot/list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRequest {
    pub obj_type: Option<String>,
    pub obj_id: Option<Value>,
    pub target_object_type: Option<String>,
}

/// Query of `GET pivot/belongs-to`: `obj_*` names the target.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BelongsToRequest {
    pub obj_type: Option<String>,
    pub obj_id: Option<Value>,
    pub source_object_type: Option<String>,
}

/// Query of `GET pivot/widget`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WidgetRequest {
    pub obj_type: Option<String>,
    pub obj_id: Option<Value>,
    pub target_object_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub page: Option<Value>,
    #[serde(default)]
    pub num_per_page: Option<Value>,
}

impl PivotActions<'_> {
    /// Lists the targets attached to a source, in stored order.
    pub fn list(&self, request: &ListRequest) -> ActionResponse {
        let source = parse_object_param(request.obj_type.as_deref(), request.obj_id.as_ref());
        let target_type = parse_type_param(request.target_object_type.as_deref());
        let (Some(source), Some(target_type)) = (source, target_type) else {
            return ActionResponse::invalid("Invalid parameters for Pivot.");
        };

        match self.service().list_pivots(&source, &target_type) {
            Ok(items) => {
                let mut response = ActionResponse::new().succeed();
                response.items = Some(items);
                response
            }
            Err(err) => ActionResponse::from_service_error("list", &err),
        }
    }

    /// Lists the sources a target belongs to.
    pub fn belongs_to(&self, request: &BelongsToRequest) -> ActionResponse {
        let target = parse_object_param(request.obj_type.as_deref(), request.obj_id.as_ref());
        let source_type = parse_type_param(request.source_object_type.as_deref());
        let (Some(target), Some(source_type)) = (target, source_type) else {
            return ActionResponse::invalid("Invalid parameters for Pivot.");
        };

        match self.service().list_sources(&target, &source_type) {
            Ok(items) => {
                let mut response = ActionResponse::new().succeed();
                response.items = Some(items);
                response
            }
            Err(err) => ActionResponse::from_service_error("belongs_to", &err),
        }
    }

    /// Renders the pivot widget data for one source and target type.
    pub fn widget(&self, request: &WidgetRequest) -> ActionResponse {
        let source = parse_object_param(request.obj_type.as_deref(), request.obj_id.as_ref());
        let target_type = parse_type_param(request.target_object_type.as_deref());
        let (Some(source), Some(target_type)) = (source, target_type) else {
            return ActionResponse::invalid("Invalid parameters for Pivot.");
        };

        let mut widget = PivotWidget::new(source, target_type);
        if let Some(title) = request.title.as_deref() {
            widget = widget.with_title(title);
        }
        let paging = configure_paging(&mut widget, request);
        let rendered = paging.and_then(|()| widget.render(&self.service()));

        match rendered {
            Ok(view) => {
                let mut response = ActionResponse::new().succeed();
                response.widget = Some(view);
                response
            }
            Err(WidgetError::Service(err)) => ActionResponse::from_service_error("widget", &err),
            Err(err) => ActionResponse::new()
                .feedback(FeedbackLevel::Error, err.to_string())
                .fail(super::STATUS_BAD_REQUEST),
        }
    }
}

fn configure_paging(widget: &mut PivotWidget, request: &WidgetRequest) -> Result<(), WidgetError> {
    if let Some(value) = request.num_per_page.as_ref() {
        let num = integer_param(value).unwrap_or(-1);
        widget.set_num_per_page(num)?;
    }
    if let Some(value) = request.page.as_ref() {
        let page = integer_param(value).unwrap_or(-1);
        widget.set_page(page)?;
    }
    Ok(())
}
