//! Tantivy-based product search.
//!
//! Only active products live in the index; deactivating a product removes its document.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::Product;

const BOOST_NAME: f32 = 10.0;
const BOOST_TAGS: f32 = 6.0;
const BOOST_CATEGORY: f32 = 4.0;
const BOOST_DESCRIPTION: f32 = 2.0;

/// A matching product and its relevance score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub product_id: String,
    pub score: f32,
}

struct ProductFields {
    product_id: Field,
    name: Field,
    tags: Field,
    category: Field,
    description: Field,
}

/// Full-text index over the product catalog.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: ProductFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        let mut schema_builder = Schema::builder();
        let product_id = schema_builder.add_text_field("product_id", STRING | STORED);
        let name = schema_builder.add_text_field("name", TEXT);
        let tags = schema_builder.add_text_field("tags", TEXT);
        let category = schema_builder.add_text_field("category", TEXT);
        let description = schema_builder.add_text_field("description", TEXT);
        let schema = schema_builder.build();

        let fields = ProductFields {
            product_id,
            name,
            tags,
            category,
            description,
        };

        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Replace the index contents with the given catalog.
    pub async fn rebuild(&self, products: &[Product]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;

        let mut indexed = 0;
        for product in products.iter().filter(|p| p.is_active) {
            writer.add_document(self.create_document(product))?;
            indexed += 1;
        }

        writer.commit()?;
        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} products", indexed);
        Ok(())
    }

    /// Upsert one product. Inactive products are only removed.
    pub async fn index_product(&self, product: &Product) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.product_id, &product.id));
        if product.is_active {
            writer.add_document(self.create_document(product))?;
        }
        writer.commit()?;

        self.reader.reload()?;
        Ok(())
    }

    pub async fn remove_product(&self, product_id: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.product_id, product_id));
        writer.commit()?;

        self.reader.reload()?;
        Ok(())
    }

    /// Product ids matching the query, best first.
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SearchHit>, AppError> {
        if query_str.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        let field_boosts = [
            (self.fields.name, BOOST_NAME),
            (self.fields.tags, BOOST_TAGS),
            (self.fields.category, BOOST_CATEGORY),
            (self.fields.description, BOOST_DESCRIPTION),
        ];

        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for (field, boost) in field_boosts {
            let parser = QueryParser::for_index(&self.index, vec![field]);
            if let Ok(field_query) = parser.parse_query(query_str) {
                subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
            }
        }

        if subqueries.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Invalid search query: {}",
                query_str
            )));
        }
        let query = BooleanQuery::new(subqueries);

        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit.saturating_add(offset)))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let hits = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, address)| {
                let doc: TantivyDocument = searcher.doc(address).ok()?;
                let product_id = doc.get_first(self.fields.product_id)?.as_str()?.to_string();
                Some(SearchHit { product_id, score })
            })
            .collect();

        Ok(hits)
    }

    fn create_document(&self, product: &Product) -> TantivyDocument {
        doc!(
            self.fields.product_id => product.id.clone(),
            self.fields.name => product.name.clone(),
            self.fields.tags => product.tags.join(" "),
            self.fields.category => product.category.clone(),
            self.fields.description => product.description.clone().unwrap_or_default()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn product(id: &str, name: &str, category: &str, tags: &[&str], active: bool) -> Product {
        Product {
            id: id.to_string(),
            vendor_id: "v1".to_string(),
            name: name.to_string(),
            description: Some(format!("{} for everyday use", name)),
            category: category.to_string(),
            price: Decimal::new(1999, 2),
            stock: 5,
            images: Vec::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            is_active: active,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
            version: 1,
        }
    }

    #[tokio::test]
    async fn test_search_ranks_name_over_description() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        let mut kettle = product("1", "Kettle", "kitchen", &["tea"], true);
        kettle.description = Some("Boils water for a mug".to_string());
        let mug = product("2", "Mug", "kitchen", &["ceramic"], true);

        index.rebuild(&[kettle, mug]).await.unwrap();

        let hits = index.search("mug", 10, 0).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].product_id, "2");
    }

    #[tokio::test]
    async fn test_inactive_products_are_not_indexed() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        index
            .rebuild(&[product("1", "Lamp", "home", &[], false)])
            .await
            .unwrap();
        assert!(index.search("lamp", 10, 0).unwrap().is_empty());

        let mut lamp = product("1", "Lamp", "home", &[], true);
        index.index_product(&lamp).await.unwrap();
        assert_eq!(index.search("lamp", 10, 0).unwrap().len(), 1);

        lamp.is_active = false;
        index.index_product(&lamp).await.unwrap();
        assert!(index.search("lamp", 10, 0).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_and_tag_search() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        index
            .rebuild(&[product("1", "Trail Shoe", "footwear", &["running"], true)])
            .await
            .unwrap();
        assert_eq!(index.search("running", 10, 0).unwrap()[0].product_id, "1");

        index.remove_product("1").await.unwrap();
        assert!(index.search("running", 10, 0).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_empty_query() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        assert!(index.search("  ", 10, 0).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_zero_limit_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();
        index
            .rebuild(&[product("1", "Mug", "kitchen", &[], true)])
            .await
            .unwrap();

        assert!(index.search("mug", 0, 0).unwrap().is_empty());
        assert_eq!(index.search("mug", 5, 0).unwrap().len(), 1);
    }
}
