//! End-to-end generation against in-memory and on-disk projects

use entity_maker::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CATEGORY_PATH: &str = "src/Entity/Category.php";
const PRODUCT_PATH: &str = "src/Entity/Product.php";

fn maker(store: MemoryStore) -> EntityMaker<Psr4Registry, MemoryStore> {
    EntityMaker::new(Psr4Registry::default(), store, GenerationSettings::default()).unwrap()
}

fn strict_maker(store: MemoryStore) -> EntityMaker<Psr4Registry, MemoryStore> {
    let settings = GenerationSettings {
        nullability: NullabilityPolicy::RequiredIsNotNull,
        ..GenerationSettings::default()
    };
    EntityMaker::new(Psr4Registry::default(), store, settings).unwrap()
}

/// Project with empty `Category` and `Product` entities
fn catalog() -> MemoryStore {
    let mut maker = maker(MemoryStore::new());
    maker.generate(&EntityGenerationRequest::new("Category")).unwrap();
    maker.generate(&EntityGenerationRequest::new("Product")).unwrap();
    let store = maker.into_store();

    let mut seeded = MemoryStore::new();
    for path in store.paths() {
        seeded = seeded.with_file(path, store.get(path).unwrap());
    }
    seeded
}

fn category_request() -> EntityGenerationRequest {
    EntityGenerationRequest::new("Category")
        .with_property(
            PropertyRequest::scalar("name", ScalarKind::String)
                .required()
                .unique(),
        )
        .with_property(
            PropertyRequest::relation("parent", RelationType::OneToOne, "Category")
                .with_orphan_removal(),
        )
}

#[test]
fn test_new_category_with_self_referencing_one_to_one() {
    let mut maker = maker(MemoryStore::new());
    let report = maker.generate(&category_request()).unwrap();

    assert!(report.created);
    assert_eq!(report.entity_class, "App\\Entity\\Category");
    assert_eq!(report.fields, vec!["name", "parent"]);
    assert_eq!(
        report.written,
        vec![
            PathBuf::from(CATEGORY_PATH),
            PathBuf::from("src/Repository/CategoryRepository.php"),
            PathBuf::from(CATEGORY_PATH),
            PathBuf::from(CATEGORY_PATH),
        ]
    );

    let source = maker.store().get(CATEGORY_PATH).unwrap();
    assert!(source.contains(
        "    #[ORM\\Column(length: 255, nullable: true, unique: true)]\n    private ?string $name = null;\n"
    ));
    assert!(source.contains(
        "    #[ORM\\OneToOne(targetEntity: self::class, cascade: ['persist', 'remove'], orphanRemoval: true)]\n    #[ORM\\JoinColumn(nullable: false)]\n    private ?self $parent = null;\n"
    ));
    assert!(source.contains("    public function setParent(?self $parent): static\n"));
    assert!(!source.contains("ApiResource"));

    assert_eq!(maker.field_names("Category").unwrap(), vec!["id", "name", "parent"]);
}

#[test]
fn test_strict_nullability_drops_orphan_removal_for_optional_relation() {
    let mut maker = strict_maker(MemoryStore::new());
    maker.generate(&category_request()).unwrap();

    let source = maker.store().get(CATEGORY_PATH).unwrap();
    assert!(source.contains("    #[ORM\\Column(length: 255, unique: true)]\n    private ?string $name = null;\n"));
    assert!(source.contains(
        "    #[ORM\\OneToOne(targetEntity: self::class, cascade: ['persist', 'remove'])]\n    private ?self $parent = null;\n"
    ));
    assert!(!source.contains("orphanRemoval"));
}

#[test]
fn test_product_many_to_one_maps_inverse_collection() {
    let mut maker = maker(catalog());
    let request = EntityGenerationRequest::new("Product").with_property(
        PropertyRequest::relation("category", RelationType::ManyToOne, "Category").required(),
    );
    let report = maker.generate(&request).unwrap();

    assert!(!report.created);
    assert_eq!(
        report.written,
        vec![PathBuf::from(CATEGORY_PATH), PathBuf::from(PRODUCT_PATH)]
    );

    let product = maker.store().get(PRODUCT_PATH).unwrap();
    assert!(product.contains(
        "    #[ORM\\ManyToOne(inversedBy: 'products')]\n    private ?Category $category = null;\n"
    ));
    assert!(!product.contains("use App\\Entity\\Category;"));

    let category = maker.store().get(CATEGORY_PATH).unwrap();
    assert!(category.contains(
        "    #[ORM\\OneToMany(targetEntity: Product::class, mappedBy: 'category')]\n    private Collection $products;\n"
    ));
    assert!(category.contains("use Doctrine\\Common\\Collections\\ArrayCollection;\nuse Doctrine\\Common\\Collections\\Collection;\n"));
    assert!(category.contains("        $this->products = new ArrayCollection();\n"));
    assert!(category.contains("    public function addProduct(Product $product): static\n"));
    assert!(category.contains("                $product->setCategory(null);\n"));

    assert_eq!(maker.field_names("Category").unwrap(), vec!["id", "products"]);
}

#[test]
fn test_vendor_related_entity_is_never_touched() {
    let mut maker = maker(catalog());
    let request = EntityGenerationRequest::new("Product").with_property(
        PropertyRequest::relation(
            "category",
            RelationType::ManyToOne,
            "\\Acme\\CatalogBundle\\Entity\\Category",
        )
        .required(),
    );
    let report = maker.generate(&request).unwrap();

    assert_eq!(report.written, vec![PathBuf::from(PRODUCT_PATH)]);
    let product = maker.store().get(PRODUCT_PATH).unwrap();
    assert!(product.starts_with(
        "<?php\n\nnamespace App\\Entity;\n\nuse Acme\\CatalogBundle\\Entity\\Category;\nuse App\\Repository\\ProductRepository;\n"
    ));
    assert!(product.contains("    #[ORM\\ManyToOne]\n    private ?Category $category = null;\n"));
    assert!(!maker.store().paths().any(|path| path.starts_with("vendor")));
    assert!(!maker.store().get(CATEGORY_PATH).unwrap().contains("products"));
}

#[test]
fn test_one_to_many_adds_many_to_one_to_related_entity() {
    let mut maker = maker(catalog());
    let request = EntityGenerationRequest::new("Category").with_property(
        PropertyRequest::relation("products", RelationType::OneToMany, "Product")
            .with_orphan_removal(),
    );
    let report = maker.generate(&request).unwrap();
    assert_eq!(report.fields, vec!["products"]);

    let product = maker.store().get(PRODUCT_PATH).unwrap();
    assert!(product.contains(
        "    #[ORM\\ManyToOne(inversedBy: 'products')]\n    #[ORM\\JoinColumn(nullable: false)]\n    private ?Category $category = null;\n"
    ));

    let category = maker.store().get(CATEGORY_PATH).unwrap();
    assert!(category.contains(
        "#[ORM\\OneToMany(targetEntity: Product::class, mappedBy: 'category', orphanRemoval: true)]"
    ));
    assert_eq!(maker.store().write_count(PRODUCT_PATH), 1);
    assert_eq!(maker.store().write_count(CATEGORY_PATH), 1);
}

#[test]
fn test_self_referencing_many_to_one_lands_in_one_file() {
    let mut maker = maker(MemoryStore::new());
    let request = EntityGenerationRequest::new("Product")
        .with_property(
            PropertyRequest::scalar("title", ScalarKind::String)
                .with_max_length(120)
                .unique(),
        )
        .with_property(PropertyRequest::scalar("price", ScalarKind::Float))
        .with_property(
            PropertyRequest::relation("parent", RelationType::ManyToOne, "Product")
                .with_orphan_removal(),
        );
    let report = maker.generate(&request).unwrap();
    assert_eq!(report.written.len(), 5);

    let product = maker.store().get(PRODUCT_PATH).unwrap();
    assert!(product.contains(concat!(
        "    #[ORM\\Column(length: 120, unique: true)]\n",
        "    private ?string $title = null;\n",
        "\n",
        "    #[ORM\\Column]\n",
        "    private ?float $price = null;\n",
        "\n",
        "    #[ORM\\ManyToOne(targetEntity: self::class, inversedBy: 'products')]\n",
        "    #[ORM\\JoinColumn(nullable: false)]\n",
        "    private ?self $parent = null;\n",
        "\n",
        "    /**\n",
        "     * @var Collection<int, self>\n",
        "     */\n",
        "    #[ORM\\OneToMany(targetEntity: self::class, mappedBy: 'parent', orphanRemoval: true)]\n",
        "    private Collection $products;\n",
        "\n",
        "    public function __construct()\n",
        "    {\n",
        "        $this->products = new ArrayCollection();\n",
        "    }\n",
    )));
    assert!(product.contains(concat!(
        "    public function removeProduct(self $product): static\n",
        "    {\n",
        "        if ($this->products->removeElement($product)) {\n",
        "            // set the owning side to null (unless already changed)\n",
        "            if ($product->getParent() === $this) {\n",
        "                $product->setParent(null);\n",
        "            }\n",
        "        }\n",
        "\n",
        "        return $this;\n",
        "    }\n",
        "}\n",
    )));

    // both sides count as existing fields
    let again = EntityGenerationRequest::new("Product")
        .with_property(PropertyRequest::scalar("products", ScalarKind::Integer));
    let err = maker.generate(&again).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFieldName);
}

#[test]
fn test_duplicate_field_stops_processing() {
    let mut maker = maker(MemoryStore::new());
    let request = EntityGenerationRequest::new("Category")
        .with_property(PropertyRequest::scalar("title", ScalarKind::String))
        .with_property(PropertyRequest::scalar("slug", ScalarKind::String))
        .with_property(PropertyRequest::scalar("title", ScalarKind::Text))
        .with_property(PropertyRequest::scalar("description", ScalarKind::Text));

    assert_eq!(
        maker.run(&request),
        GenerationOutcome::Failure(ErrorKind::InvalidFieldName)
    );
    assert_eq!(maker.store().write_count(CATEGORY_PATH), 3);
    assert_eq!(
        maker.field_names("Category").unwrap(),
        vec!["id", "title", "slug"]
    );
}

#[test]
fn test_existing_field_and_reserved_names_rejected() {
    let mut maker = maker(catalog());

    let duplicate = EntityGenerationRequest::new("Product")
        .with_property(PropertyRequest::scalar("id", ScalarKind::Integer));
    assert_eq!(
        maker.generate(&duplicate).unwrap_err().kind(),
        ErrorKind::InvalidFieldName
    );

    let reserved = EntityGenerationRequest::new("Product")
        .with_property(PropertyRequest::scalar("order", ScalarKind::Integer));
    assert_eq!(
        maker.generate(&reserved).unwrap_err().kind(),
        ErrorKind::InvalidFieldName
    );

    let malformed = EntityGenerationRequest::new("Product")
        .with_property(PropertyRequest::scalar("unit price", ScalarKind::Float));
    assert_eq!(
        maker.generate(&malformed).unwrap_err().kind(),
        ErrorKind::InvalidFieldName
    );
    assert!(maker.store().writes().is_empty());
}

#[test]
fn test_related_entity_must_exist() {
    let mut maker = maker(catalog());
    let request = EntityGenerationRequest::new("Product")
        .with_property(PropertyRequest::scalar("title", ScalarKind::String))
        .with_property(PropertyRequest::relation("tags", RelationType::ManyToMany, "Tag"))
        .with_property(PropertyRequest::scalar("price", ScalarKind::Float));

    assert_eq!(
        maker.run(&request),
        GenerationOutcome::Failure(ErrorKind::InvalidEntityName)
    );
    let product = maker.store().get(PRODUCT_PATH).unwrap();
    assert!(product.contains("$title"));
    assert!(!product.contains("$tags"));
    assert!(!product.contains("$price"));
}

const VENDOR_CATEGORY_PATH: &str = "vendor/Acme/CatalogBundle/Entity/Category.php";
const VENDOR_CATEGORY: &str = "<?php\n\nnamespace Acme\\CatalogBundle\\Entity;\n\nuse Doctrine\\ORM\\Mapping as ORM;\n\n#[ORM\\Entity]\nclass Category\n{\n    #[ORM\\Id]\n    #[ORM\\GeneratedValue]\n    #[ORM\\Column]\n    private ?int $id = null;\n}\n";

#[test]
fn test_vendor_entity_cannot_be_the_target() {
    let mut maker = maker(catalog().with_file(VENDOR_CATEGORY_PATH, VENDOR_CATEGORY));

    let request = EntityGenerationRequest::new("\\Acme\\CatalogBundle\\Entity\\Category")
        .with_property(PropertyRequest::relation("products", RelationType::OneToMany, "Product"));

    assert_eq!(
        maker.run(&request),
        GenerationOutcome::Failure(ErrorKind::InvalidEntityName)
    );
    assert!(maker.store().writes().is_empty());
    assert_eq!(maker.store().get(VENDOR_CATEGORY_PATH), Some(VENDOR_CATEGORY));
}

#[test]
fn test_missing_vendor_entity_is_not_created() {
    let mut maker = maker(MemoryStore::new());

    let request = EntityGenerationRequest::new("\\Acme\\CatalogBundle\\Entity\\Brand")
        .with_property(PropertyRequest::scalar("name", ScalarKind::String));

    assert_eq!(
        maker.run(&request),
        GenerationOutcome::Failure(ErrorKind::InvalidEntityName)
    );
    assert_eq!(maker.store().paths().count(), 0);
}

#[test]
fn test_one_to_many_to_vendor_entity_is_inconsistent() {
    let mut maker = maker(catalog().with_file(VENDOR_CATEGORY_PATH, VENDOR_CATEGORY));

    let request = EntityGenerationRequest::new("Product").with_property(PropertyRequest::relation(
        "categories",
        RelationType::OneToMany,
        "\\Acme\\CatalogBundle\\Entity\\Category",
    ));

    assert_eq!(
        maker.run(&request),
        GenerationOutcome::Failure(ErrorKind::InverseMappingInconsistency)
    );
    assert!(maker.store().writes().is_empty());
    assert_eq!(maker.store().get(VENDOR_CATEGORY_PATH), Some(VENDOR_CATEGORY));
    assert!(!maker.store().get(PRODUCT_PATH).unwrap().contains("categories"));
}

#[test]
fn test_many_to_many_both_sides() {
    let mut maker = maker(catalog());
    let request = EntityGenerationRequest::new("Product").with_property(
        PropertyRequest::relation("categories", RelationType::ManyToMany, "Category"),
    );
    maker.generate(&request).unwrap();

    let product = maker.store().get(PRODUCT_PATH).unwrap();
    assert!(product.contains("#[ORM\\ManyToMany(targetEntity: Category::class, inversedBy: 'products')]"));
    assert!(product.contains("    public function addCategory(Category $category): static\n"));

    let category = maker.store().get(CATEGORY_PATH).unwrap();
    assert!(category.contains("#[ORM\\ManyToMany(targetEntity: Product::class, mappedBy: 'categories')]"));
    assert!(category.contains("            $product->addCategory($this);\n"));
    assert!(category.contains("            $product->removeCategory($this);\n"));
}

#[test]
fn test_api_resource_on_new_entity() {
    let mut maker = maker(MemoryStore::new());
    let request = EntityGenerationRequest::from_json(
        r#"{
            "entityName": "Tag",
            "apiResources": true,
            "properties": [
                {"name": "label", "kind": "string", "maxLength": 64},
                {"name": "createdAt", "kind": "timestamp"}
            ]
        }"#,
    )
    .unwrap();
    maker.generate(&request).unwrap();

    let tag = maker.store().get("src/Entity/Tag.php").unwrap();
    assert!(tag.contains("use ApiPlatform\\Metadata\\ApiResource;\n"));
    assert!(tag.contains("#[ApiResource]\nclass Tag\n"));
    assert!(tag.contains("#[ORM\\Column(length: 64)]"));
    assert!(tag.contains("private ?\\DateTimeImmutable $createdAt = null;"));
}

#[test]
fn test_generation_on_disk() {
    let dir = TempDir::new().unwrap();
    let config = EntityMakerConfig::load_for_project(dir.path()).unwrap();
    let mut maker = EntityMaker::new(
        Psr4Registry::new(&config.project),
        FsStore::new(&config.project.root),
        config.generation,
    )
    .unwrap();

    let request = EntityGenerationRequest::new("Admin\\User")
        .with_property(PropertyRequest::scalar("email", ScalarKind::String).unique());
    let report = maker.generate(&request).unwrap();
    assert_eq!(report.entity_path, Path::new("src/Entity/Admin/User.php"));

    let user = std::fs::read_to_string(dir.path().join("src/Entity/Admin/User.php")).unwrap();
    assert!(user.starts_with("<?php\n\nnamespace App\\Entity\\Admin;\n"));
    assert!(user.contains("$email = null;"));

    let repository =
        std::fs::read_to_string(dir.path().join("src/Repository/Admin/UserRepository.php")).unwrap();
    assert!(repository.contains("namespace App\\Repository\\Admin;"));
    assert!(repository.contains("use App\\Entity\\Admin\\User;"));
}

#[test]
fn test_dry_run_overlay_leaves_base_untouched() {
    let base = catalog();
    let mut maker = EntityMaker::new(
        Psr4Registry::default(),
        OverlayStore::new(base),
        GenerationSettings::default(),
    )
    .unwrap();

    let request = EntityGenerationRequest::new("Product").with_property(
        PropertyRequest::relation("category", RelationType::ManyToOne, "Category"),
    );
    maker.generate(&request).unwrap();

    let overlay = maker.into_store();
    assert!(overlay.base().writes().is_empty());
    let changes = overlay.changes().unwrap();
    let paths: Vec<&Path> = changes.iter().map(|change| change.path).collect();
    assert_eq!(paths, vec![Path::new(CATEGORY_PATH), Path::new(PRODUCT_PATH)]);
}
