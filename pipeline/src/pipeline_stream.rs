use async_fn_stream::{TryStreamEmitter, try_fn_stream};
use async_trait::async_trait;
use futures::Stream;

#[async_trait(?Send)]
pub trait PipelineStream: Sized {
    type Message: 'static;

    async fn run(
        &mut self,
        emitter: TryStreamEmitter<Self::Message, anyhow::Error>,
    ) -> anyhow::Result<()>;

    /// Runs the stage to completion, yielding its messages as they are emitted.
    fn launch(mut self) -> impl Stream<Item = anyhow::Result<Self::Message>> {
        try_fn_stream(|emitter| async move { self.run(emitter).await })
    }
}
