//! Generic repository over a data source and a change tracker

use std::marker::PhantomData;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
use super::page::Page;
use super::traits::{unsupported_include, DataSource, Entity, Repository, RepositoryResult};
use super::unit_of_work::{Change, ChangeTracker};
use crate::evaluator;
use crate::hierarchy::{Hierarchical, HierarchySource, MinimalNode};
use crate::specification::Specification;

/// Repository that reads from `S` and stages writes on `C`
///
/// The change tracker is the session the repository is scoped to; commit
/// it through its own [`UnitOfWork`](super::UnitOfWork) handle.
///
/// Before any read, specification includes are checked against what the
/// source supports, so a bad include fails without touching data. Source
/// failures are logged, tagged with the operation and specification, and
/// returned unchanged otherwise.
pub struct GenericRepository<T, S, C> {
    source: S,
    changes: C,
    _entity: PhantomData<fn() -> T>,
}

impl<T, S, C> GenericRepository<T, S, C>
where
    T: Entity,
    S: DataSource<T>,
    C: ChangeTracker<T>,
{
    /// Wrap a data source and the session that receives staged writes
    pub fn new(source: S, changes: C) -> Self {
        Self {
            source,
            changes,
            _entity: PhantomData,
        }
    }

    /// The underlying data source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The session receiving staged writes
    pub fn changes(&self) -> &C {
        &self.changes
    }

    fn check_includes(&self, spec: &Specification<T>) -> RepositoryResult<()> {
        match spec
            .includes()
            .iter()
            .find(|path| !self.source.supports_include(path))
        {
            Some(path) => Err(unsupported_include::<T>(path)),
            None => Ok(()),
        }
    }

    async fn stage(
        &self,
        operation: RepositoryOperation,
        change: Change<T>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<()> {
        if let Change::Add(entity) | Change::Update(entity) = &change {
            entity
                .validate()
                .map_err(|violation| {
                    violation
                        .into_error(operation)
                        .with_entity(T::TYPE_NAME, entity.id().to_string())
                })?;
        }
        if cancel.is_cancelled() {
            return Err(RepositoryError::cancelled(operation));
        }
        self.changes
            .stage(change, cancel)
            .await
            .map_err(|error| context::<T>(error, operation, None))
    }
}

/// Tag an error leaving the repository and log source failures
fn context<T: Entity>(
    error: RepositoryError,
    operation: RepositoryOperation,
    spec: Option<&str>,
) -> RepositoryError {
    let error = error.within(operation, spec).with_entity_type(T::TYPE_NAME);
    if error.kind == RepositoryErrorKind::Unexpected {
        warn!(
            entity = T::TYPE_NAME,
            %operation,
            specification = spec.unwrap_or("-"),
            error = %error,
            "data source failure"
        );
    }
    error
}

impl<T, S, C> Repository<T> for GenericRepository<T, S, C>
where
    T: Entity,
    S: DataSource<T>,
    C: ChangeTracker<T>,
{
    #[tracing::instrument(skip_all, fields(entity = T::TYPE_NAME, id = %id))]
    async fn get_by_id(
        &self,
        id: &T::Id,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Option<T>> {
        let found = self
            .source
            .get(id, cancel)
            .await
            .map_err(|e| context::<T>(e, RepositoryOperation::GetById, None))?;
        debug!(found = found.is_some(), "lookup finished");
        Ok(found)
    }

    #[tracing::instrument(skip_all, fields(entity = T::TYPE_NAME, id = %id))]
    async fn exists(&self, id: &T::Id, cancel: &CancellationToken) -> RepositoryResult<bool> {
        self.source
            .get(id, cancel)
            .await
            .map(|found| found.is_some())
            .map_err(|e| context::<T>(e, RepositoryOperation::Exists, None))
    }

    #[tracing::instrument(skip_all, fields(entity = T::TYPE_NAME))]
    async fn list_all(&self, cancel: &CancellationToken) -> RepositoryResult<Vec<T>> {
        let items = self
            .source
            .scan(None, cancel)
            .await
            .map_err(|e| context::<T>(e, RepositoryOperation::ListAll, None))?;
        debug!(returned = items.len(), "listed all");
        Ok(items)
    }

    #[tracing::instrument(skip_all, fields(entity = T::TYPE_NAME, spec = %spec.describe()))]
    async fn find_by_specification(
        &self,
        spec: &Specification<T>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<T>> {
        let operation = RepositoryOperation::FindBySpecification;
        self.check_includes(spec)
            .map_err(|e| context::<T>(e, operation, None))?;
        let items = evaluator::evaluate(&self.source, spec, cancel)
            .await
            .map_err(|e| context::<T>(e, operation, Some(&spec.describe())))?;
        debug!(returned = items.len(), "specification evaluated");
        Ok(items)
    }

    #[tracing::instrument(skip_all, fields(entity = T::TYPE_NAME, spec = %spec.describe()))]
    async fn count_by_specification(
        &self,
        spec: &Specification<T>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<u64> {
        let operation = RepositoryOperation::CountBySpecification;
        let total = evaluator::count(&self.source, spec, cancel)
            .await
            .map_err(|e| context::<T>(e, operation, Some(&spec.describe())))?;
        debug!(total, "specification counted");
        Ok(total)
    }

    #[tracing::instrument(skip_all, fields(entity = T::TYPE_NAME, spec = %spec.describe()))]
    async fn find_page(
        &self,
        spec: &Specification<T>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Page<T>> {
        let operation = RepositoryOperation::FindPage;
        self.check_includes(spec)
            .map_err(|e| context::<T>(e, operation, None))?;
        let (total, items) = futures::future::try_join(
            evaluator::count(&self.source, spec, cancel),
            evaluator::evaluate(&self.source, spec, cancel),
        )
        .await
        .map_err(|e| context::<T>(e, operation, Some(&spec.describe())))?;
        debug!(total, returned = items.len(), "page evaluated");
        Ok(Page::new(items, total, spec.paging()))
    }

    #[tracing::instrument(skip_all, fields(entity = T::TYPE_NAME, id = %entity.id()))]
    async fn add(&self, entity: T, cancel: &CancellationToken) -> RepositoryResult<()> {
        self.stage(RepositoryOperation::Add, Change::Add(entity), cancel)
            .await
    }

    #[tracing::instrument(skip_all, fields(entity = T::TYPE_NAME, id = %entity.id()))]
    async fn update(&self, entity: T, cancel: &CancellationToken) -> RepositoryResult<()> {
        self.stage(RepositoryOperation::Update, Change::Update(entity), cancel)
            .await
    }

    #[tracing::instrument(skip_all, fields(entity = T::TYPE_NAME, id = %entity.id()))]
    async fn delete(&self, entity: &T, cancel: &CancellationToken) -> RepositoryResult<()> {
        self.stage(
            RepositoryOperation::Delete,
            Change::Delete(entity.id().clone()),
            cancel,
        )
        .await
    }
}

impl<T, S, C> HierarchySource<T::Id> for GenericRepository<T, S, C>
where
    T: Hierarchical,
    S: DataSource<T>,
    C: ChangeTracker<T>,
{
    /// Project every stored entity; the assembler keeps what the root reaches
    #[tracing::instrument(skip_all, fields(entity = T::TYPE_NAME, root = %root))]
    async fn minimal_nodes(
        &self,
        root: &T::Id,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<MinimalNode<T::Id>>> {
        let nodes: Vec<_> = self
            .source
            .scan(None, cancel)
            .await
            .map_err(|e| context::<T>(e, RepositoryOperation::BuildTree, None))?
            .iter()
            .map(Hierarchical::node)
            .collect();
        debug!(returned = nodes.len(), "minimal projection loaded");
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemorySession, MemoryStore};
    use crate::repository::UnitOfWork;
    use crate::repository::Violation;
    use crate::specification::{
        Criteria, IncludePath, OrderDirection, Predicate, QuerySettings, SortFields,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Status {
        Active,
        Archived,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Doc {
        id: u32,
        title: Option<String>,
        status: Status,
        rank: i64,
    }

    impl Entity for Doc {
        type Id = u32;
        const TYPE_NAME: &'static str = "Doc";

        fn id(&self) -> &u32 {
            &self.id
        }

        fn validate(&self) -> Result<(), Violation> {
            match self.title.as_deref() {
                Some(title) if !title.trim().is_empty() => Ok(()),
                _ => Err(Violation::new("title", "is required")),
            }
        }
    }

    fn doc(id: u32, title: &str, status: Status, rank: i64) -> Doc {
        Doc {
            id,
            title: Some(title.to_string()),
            status,
            rank,
        }
    }

    fn docs() -> Vec<Doc> {
        vec![
            doc(1, "alpha", Status::Active, 3),
            doc(2, "beta", Status::Archived, 1),
            doc(3, "gamma", Status::Active, 2),
            doc(4, "delta", Status::Active, 3),
            Doc {
                id: 5,
                title: None,
                status: Status::Active,
                rank: 1,
            },
            doc(6, "omega", Status::Archived, 2),
            doc(7, "kappa", Status::Active, 3),
        ]
    }

    fn sort_fields() -> SortFields<Doc> {
        SortFields::new()
            .field("rank", |d: &Doc| d.rank.into())
            .field("title", |d: &Doc| d.title.clone().into())
    }

    type MemRepo = GenericRepository<Doc, MemoryStore<Doc>, MemorySession<Doc>>;

    fn repository() -> (MemRepo, MemorySession<Doc>) {
        let store = MemoryStore::from(docs());
        let session = store.session();
        (GenericRepository::new(store, session.clone()), session)
    }

    fn ids(items: &[Doc]) -> Vec<u32> {
        items.iter().map(|d| d.id).collect()
    }

    /// Source that fails every call and counts how often it was touched
    #[derive(Default)]
    struct TrapSource {
        touched: AtomicUsize,
    }

    impl TrapSource {
        fn fail(&self, operation: RepositoryOperation) -> RepositoryError {
            self.touched.fetch_add(1, Ordering::SeqCst);
            RepositoryError::from_source(
                operation,
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "store unreachable"),
            )
        }
    }

    impl DataSource<Doc> for TrapSource {
        async fn get(
            &self,
            _id: &u32,
            _cancel: &CancellationToken,
        ) -> RepositoryResult<Option<Doc>> {
            Err(self.fail(RepositoryOperation::GetById))
        }

        async fn scan(
            &self,
            _filter: Option<&Predicate<Doc>>,
            _cancel: &CancellationToken,
        ) -> RepositoryResult<Vec<Doc>> {
            Err(self.fail(RepositoryOperation::FindBySpecification))
        }

        async fn count(
            &self,
            _filter: Option<&Predicate<Doc>>,
            _cancel: &CancellationToken,
        ) -> RepositoryResult<u64> {
            Err(self.fail(RepositoryOperation::CountBySpecification))
        }
    }

    fn trap_repository() -> GenericRepository<Doc, TrapSource, MemorySession<Doc>> {
        GenericRepository::new(TrapSource::default(), MemoryStore::new().session())
    }

    #[tokio::test]
    async fn test_get_by_id_absence_is_not_an_error() {
        let (repo, _) = repository();
        let cancel = CancellationToken::new();
        assert_eq!(
            repo.get_by_id(&3, &cancel).await.unwrap().map(|d| d.id),
            Some(3)
        );
        assert!(repo.get_by_id(&99, &cancel).await.unwrap().is_none());
        assert!(repo.exists(&1, &cancel).await.unwrap());
        assert!(!repo.exists(&99, &cancel).await.unwrap());
    }

    #[tokio::test]
    async fn test_unfiltered_specification_equals_list_all() {
        let (repo, _) = repository();
        let cancel = CancellationToken::new();
        let all = repo.list_all(&cancel).await.unwrap();
        let found = repo
            .find_by_specification(&Specification::all(), &cancel)
            .await
            .unwrap();
        assert_eq!(found, all);
        assert_eq!(all.len(), 7);
    }

    #[tokio::test]
    async fn test_filter_returns_exact_subset_and_count() {
        let (repo, _) = repository();
        let cancel = CancellationToken::new();
        let filter = Predicate::new(|d: &Doc| d.rank >= 2);
        let spec = Specification::builder()
            .filter(filter.clone())
            .build()
            .unwrap();

        let found = repo.find_by_specification(&spec, &cancel).await.unwrap();
        let expected: Vec<Doc> = docs().into_iter().filter(|d| filter.matches(d)).collect();
        assert_eq!(found, expected);
        assert_eq!(
            repo.count_by_specification(&spec, &cancel).await.unwrap(),
            expected.len() as u64
        );
    }

    #[tokio::test]
    async fn test_combined_filters_intersect() {
        let (repo, _) = repository();
        let cancel = CancellationToken::new();
        let spec = Specification::builder()
            .filter(
                Criteria::new()
                    .and(Predicate::contains_text(|d: &Doc| d.title.as_deref(), "a"))
                    .and(Predicate::eq(|d: &Doc| &d.status, Status::Active))
                    .build(),
            )
            .build()
            .unwrap();
        let found = repo.find_by_specification(&spec, &cancel).await.unwrap();
        // beta and omega match the title only, 5 has no title at all
        assert_eq!(ids(&found), vec![1, 3, 4, 7]);
    }

    #[tokio::test]
    async fn test_count_unaffected_by_paging() {
        let (repo, _) = repository();
        let cancel = CancellationToken::new();
        let filter = Predicate::eq(|d: &Doc| &d.status, Status::Active);
        let unpaged = Specification::builder()
            .filter(filter.clone())
            .build()
            .unwrap();
        let paged = Specification::builder()
            .filter(filter)
            .skip_take(1, 2)
            .build()
            .unwrap();
        assert_eq!(
            repo.count_by_specification(&unpaged, &cancel)
                .await
                .unwrap(),
            5
        );
        assert_eq!(
            repo.count_by_specification(&paged, &cancel).await.unwrap(),
            5
        );
        assert_eq!(
            repo.find_by_specification(&paged, &cancel)
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_sort_is_stable_for_equal_keys() {
        let (repo, _) = repository();
        let cancel = CancellationToken::new();
        let spec = Specification::builder()
            .order_by_field(&sort_fields(), "rank", OrderDirection::Descending)
            .build()
            .unwrap();
        let found = repo.find_by_specification(&spec, &cancel).await.unwrap();
        assert_eq!(ids(&found), vec![1, 4, 7, 3, 6, 2, 5]);
    }

    #[tokio::test]
    async fn test_pages_are_exhaustive_without_duplicates() {
        let (repo, _) = repository();
        let cancel = CancellationToken::new();
        let settings = QuerySettings::default();
        let ordered = || {
            Specification::builder().order_by_field(
                &sort_fields(),
                "rank",
                OrderDirection::Ascending,
            )
        };
        let full = repo
            .find_by_specification(&ordered().build().unwrap(), &cancel)
            .await
            .unwrap();

        let mut stitched = Vec::new();
        let mut page_number = 1;
        loop {
            let spec = ordered().page(page_number, 3, &settings).build().unwrap();
            let page = repo.find_page(&spec, &cancel).await.unwrap();
            assert_eq!(page.total, 7);
            stitched.extend(page.items.clone());
            if !page.has_next {
                break;
            }
            page_number += 1;
        }
        assert_eq!(page_number, 3);
        assert_eq!(stitched, full);
    }

    #[tokio::test]
    async fn test_unknown_sort_field_never_touches_source() {
        let repo = trap_repository();
        let result = Specification::builder()
            .order_by_field(&sort_fields(), "colour", OrderDirection::Ascending)
            .build();
        let error = match result {
            Ok(spec) => repo
                .find_by_specification(&spec, &CancellationToken::new())
                .await
                .unwrap_err(),
            Err(error) => error,
        };
        assert_eq!(error.kind, RepositoryErrorKind::InvalidArgument);
        assert_eq!(repo.source().touched.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_non_positive_paging_never_touches_source() {
        let repo = trap_repository();
        let settings = QuerySettings::default();
        for (page, size) in [(0, 10), (-1, 10), (1, 0), (1, -3)] {
            let error = Specification::<Doc>::builder()
                .page(page, size, &settings)
                .build()
                .unwrap_err();
            assert_eq!(error.kind, RepositoryErrorKind::InvalidArgument);
        }
        assert_eq!(repo.source().touched.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_include_never_touches_source() {
        let repo = trap_repository();
        let spec = Specification::<Doc>::builder()
            .include("author")
            .build()
            .unwrap();
        let error = repo
            .find_by_specification(&spec, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(error.kind, RepositoryErrorKind::InvalidArgument);
        assert_eq!(error.field.as_deref(), Some("include"));
        assert_eq!(repo.source().touched.load(Ordering::SeqCst), 0);
        assert!(!repo
            .source()
            .supports_include(&IncludePath::parse("author").unwrap()));
    }

    #[tokio::test]
    async fn test_source_failure_is_wrapped_with_context() {
        let repo = trap_repository();
        let spec = Specification::builder()
            .named("active_docs")
            .filter(Predicate::eq(|d: &Doc| &d.status, Status::Active))
            .build()
            .unwrap();
        let error = repo
            .find_by_specification(&spec, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(error.kind, RepositoryErrorKind::Unexpected);
        assert_eq!(error.operation, RepositoryOperation::FindBySpecification);
        assert_eq!(
            error.specification.as_deref(),
            Some("active_docs: filter(1)")
        );
        assert_eq!(error.entity_type.as_deref(), Some("Doc"));
        assert!(std::error::Error::source(&error).is_some());
        // One attempt, no retries
        assert_eq!(repo.source().touched.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_find_page_failure_reports_find_page() {
        let repo = trap_repository();
        let error = repo
            .find_page(&Specification::all(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(error.operation, RepositoryOperation::FindPage);
        assert_eq!(error.kind, RepositoryErrorKind::Unexpected);
    }

    #[tokio::test]
    async fn test_mutations_are_staged_until_saved() {
        let (repo, session) = repository();
        let cancel = CancellationToken::new();

        repo.add(doc(8, "sigma", Status::Active, 1), &cancel)
            .await
            .unwrap();
        let mut three = repo.get_by_id(&3, &cancel).await.unwrap().unwrap();
        three.rank = 9;
        repo.update(three, &cancel).await.unwrap();
        let two = repo.get_by_id(&2, &cancel).await.unwrap().unwrap();
        repo.delete(&two, &cancel).await.unwrap();

        assert!(repo.get_by_id(&8, &cancel).await.unwrap().is_none());
        assert_eq!(session.save_changes(&cancel).await.unwrap(), 3);

        assert!(repo.exists(&8, &cancel).await.unwrap());
        assert!(!repo.exists(&2, &cancel).await.unwrap());
        assert_eq!(repo.get_by_id(&3, &cancel).await.unwrap().unwrap().rank, 9);
    }

    #[tokio::test]
    async fn test_invalid_entity_is_rejected_before_staging() {
        let (repo, session) = repository();
        let cancel = CancellationToken::new();
        let untitled = Doc {
            id: 9,
            title: None,
            status: Status::Active,
            rank: 0,
        };

        let error = repo.add(untitled.clone(), &cancel).await.unwrap_err();
        assert_eq!(error.kind, RepositoryErrorKind::InvalidArgument);
        assert_eq!(error.operation, RepositoryOperation::Add);
        assert_eq!(error.field.as_deref(), Some("title"));
        assert_eq!(error.entity_id.as_deref(), Some("9"));

        let error = repo.update(untitled.clone(), &cancel).await.unwrap_err();
        assert_eq!(error.operation, RepositoryOperation::Update);

        // Deletes only need the id
        repo.delete(&untitled, &cancel).await.unwrap();
        assert_eq!(session.pending(&cancel).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_staging() {
        let (repo, session) = repository();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let error = repo
            .add(doc(10, "late", Status::Active, 1), &cancel)
            .await
            .unwrap_err();
        assert!(error.is_cancelled());
        assert!(session
            .pending(&CancellationToken::new())
            .await
            .unwrap()
            .is_empty());
    }

    #[derive(Debug, Clone)]
    struct Folder {
        id: u32,
        name: &'static str,
        parent: Option<u32>,
    }

    impl Entity for Folder {
        type Id = u32;
        const TYPE_NAME: &'static str = "Folder";

        fn id(&self) -> &u32 {
            &self.id
        }
    }

    impl Hierarchical for Folder {
        fn node(&self) -> MinimalNode<u32> {
            MinimalNode::new(self.id, self.name, self.parent)
        }
    }

    #[tokio::test]
    async fn test_repository_feeds_hierarchy_assembler() {
        let store: MemoryStore<Folder> = [
            Folder {
                id: 1,
                name: "root",
                parent: None,
            },
            Folder {
                id: 2,
                name: "src",
                parent: Some(1),
            },
            Folder {
                id: 3,
                name: "docs",
                parent: Some(1),
            },
            Folder {
                id: 4,
                name: "bin",
                parent: Some(2),
            },
            Folder {
                id: 5,
                name: "elsewhere",
                parent: None,
            },
        ]
        .into_iter()
        .collect();
        let repo = GenericRepository::new(store.clone(), store.session());
        let assembler = crate::hierarchy::HierarchyAssembler::new(repo);
        let cancel = CancellationToken::new();

        let tree = assembler.build_tree(&2, &cancel).await.unwrap().unwrap();
        assert_eq!(tree.name, "src");
        assert_eq!(tree.size(), 2);
        assert!(assembler.build_tree(&77, &cancel).await.unwrap().is_none());
    }
}
