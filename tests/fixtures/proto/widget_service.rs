use super::models::*;

/// Widget catalogue.
/// @group /widgets
pub trait WidgetService {
    /// Fetch one widget.
    /// @route GET /{id}
    async fn get(&self, ctx: Context, req: &GetWidgetReq) -> Result<Widget, Error>;

    /// Create a widget.
    /// @route POST /
    /// @code 201
    async fn create(&self, ctx: Context, req: &CreateWidgetReq) -> Result<Box<Widget>, Error>;

    /// List widgets.
    /// @route GET /
    async fn list(&self, ctx: Context, req: ()) -> Result<WidgetPage, Error>;

    /// @route DELETE /{id}
    async fn delete(&self, ctx: Context, req: &GetWidgetReq) -> Result<Empty, Error>;
}
