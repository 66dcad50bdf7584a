use tracing::{info, instrument};

use printworks_core::WorkspaceId;
use printworks_products::{Product, RegisterProduct};

use super::Engine;
use crate::error::EngineResult;
use crate::store::Store;

impl<S: Store> Engine<S> {
    #[instrument(skip(self, cmd), fields(workspace_id = %workspace_id, product_id = %cmd.product_id), err)]
    pub async fn register_product(
        &self,
        workspace_id: WorkspaceId,
        cmd: RegisterProduct,
    ) -> EngineResult<Product> {
        let product = Product::register(workspace_id, &cmd)?;

        let mut uow = self.store.begin().await?;
        uow.insert_product(&product).await?;
        uow.commit().await?;

        info!(product_id = %product.id, sku = ?product.sku, "product registered");
        Ok(product)
    }
}
